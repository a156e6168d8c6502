// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-vendor validation rule tables.

use super::VendorKind;
use crate::models::order::{CardBrand, PaymentMethod};

/// Maximum field lengths a vendor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    /// First and last name, each
    pub name: usize,
    pub address: usize,
    pub city: usize,
    pub email: usize,
    pub sku: usize,
    pub notes: usize,
}

/// Everything checked locally before an order goes to a vendor.
#[derive(Debug, Clone, Copy)]
pub struct VendorRules {
    pub kind: VendorKind,
    /// Two-letter states the vendor does not sell into
    pub restricted_states: &'static [&'static str],
    /// Card number prefixes the vendor refuses
    pub blocked_bins: &'static [&'static str],
    pub card_brands: &'static [CardBrand],
    pub payment_methods: &'static [PaymentMethod],
    pub countries: &'static [&'static str],
    pub limits: FieldLimits,
    pub min_amount_cents: u64,
    pub max_amount_cents: u64,
    pub phone_required: bool,
}

const ALL_BRANDS: &[CardBrand] = &[
    CardBrand::Visa,
    CardBrand::Mastercard,
    CardBrand::Amex,
    CardBrand::Discover,
];
const NO_AMEX: &[CardBrand] = &[CardBrand::Visa, CardBrand::Mastercard, CardBrand::Discover];
const CARD_ONLY: &[PaymentMethod] = &[PaymentMethod::Card];
const CARD_OR_ACH: &[PaymentMethod] = &[PaymentMethod::Card, PaymentMethod::Ach];
const US_ONLY: &[&str] = &["US"];

const RADIUS: VendorRules = VendorRules {
    kind: VendorKind::Radius,
    restricted_states: &["ME", "VT", "WI"],
    blocked_bins: &["400022", "414720", "517805", "546616"],
    card_brands: NO_AMEX,
    payment_methods: CARD_ONLY,
    countries: US_ONLY,
    limits: FieldLimits {
        name: 30,
        address: 50,
        city: 30,
        email: 80,
        sku: 20,
        notes: 255,
    },
    min_amount_cents: 100,
    max_amount_cents: 50_000,
    phone_required: false,
};

const SEMPRIS: VendorRules = VendorRules {
    kind: VendorKind::Sempris,
    restricted_states: &["IA", "MN", "ND", "VT", "WI"],
    blocked_bins: &["440066", "546616", "601100"],
    card_brands: NO_AMEX,
    payment_methods: CARD_OR_ACH,
    countries: US_ONLY,
    limits: FieldLimits {
        name: 25,
        address: 40,
        city: 25,
        email: 60,
        sku: 16,
        notes: 0,
    },
    min_amount_cents: 0,
    max_amount_cents: 20_000,
    phone_required: true,
};

const PSONLINE: VendorRules = VendorRules {
    kind: VendorKind::PsOnline,
    restricted_states: &["ME", "VT", "WA"],
    blocked_bins: &["414720", "426684"],
    card_brands: ALL_BRANDS,
    payment_methods: CARD_OR_ACH,
    countries: US_ONLY,
    limits: FieldLimits {
        name: 50,
        address: 60,
        city: 40,
        email: 100,
        sku: 32,
        notes: 500,
    },
    min_amount_cents: 100,
    max_amount_cents: 100_000,
    phone_required: false,
};

const MI: VendorRules = VendorRules {
    kind: VendorKind::Mi,
    restricted_states: &["ME", "MN", "UT", "VT", "WI"],
    blocked_bins: &["400022", "440066", "517805"],
    card_brands: &[CardBrand::Visa, CardBrand::Mastercard],
    payment_methods: CARD_ONLY,
    countries: US_ONLY,
    limits: FieldLimits {
        name: 20,
        address: 35,
        city: 20,
        email: 50,
        sku: 12,
        notes: 100,
    },
    min_amount_cents: 100,
    max_amount_cents: 25_000,
    phone_required: true,
};

const IMPORTSALE: VendorRules = VendorRules {
    kind: VendorKind::ImportSale,
    restricted_states: &[],
    blocked_bins: &["426684"],
    card_brands: ALL_BRANDS,
    payment_methods: CARD_OR_ACH,
    countries: US_ONLY,
    limits: FieldLimits {
        name: 50,
        address: 100,
        city: 50,
        email: 100,
        sku: 64,
        notes: 500,
    },
    min_amount_cents: 0,
    max_amount_cents: 250_000,
    phone_required: false,
};

const SUBLYTICS: VendorRules = VendorRules {
    kind: VendorKind::Sublytics,
    restricted_states: &["ME"],
    blocked_bins: &["400022"],
    card_brands: ALL_BRANDS,
    payment_methods: CARD_ONLY,
    countries: &["US", "CA"],
    limits: FieldLimits {
        name: 64,
        address: 128,
        city: 64,
        email: 128,
        sku: 64,
        notes: 255,
    },
    min_amount_cents: 100,
    max_amount_cents: 100_000,
    phone_required: false,
};

impl VendorKind {
    /// Validation rules for this vendor.
    pub fn rules(&self) -> &'static VendorRules {
        match self {
            VendorKind::Radius => &RADIUS,
            VendorKind::Sempris => &SEMPRIS,
            VendorKind::PsOnline => &PSONLINE,
            VendorKind::Mi => &MI,
            VendorKind::ImportSale => &IMPORTSALE,
            VendorKind::Sublytics => &SUBLYTICS,
        }
    }
}

impl VendorRules {
    pub fn accepts_method(&self, method: PaymentMethod) -> bool {
        self.payment_methods.contains(&method)
    }

    pub fn accepts_brand(&self, brand: CardBrand) -> bool {
        self.card_brands.contains(&brand)
    }

    pub fn is_restricted_state(&self, state: &str) -> bool {
        self.restricted_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(state.trim()))
    }

    pub fn is_blocked_bin(&self, card_number: &str) -> bool {
        self.blocked_bins
            .iter()
            .any(|prefix| card_number.starts_with(prefix))
    }

    pub fn accepts_country(&self, country: &str) -> bool {
        self.countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vendor_has_its_own_rules() {
        for kind in VendorKind::ALL {
            let rules = kind.rules();
            assert_eq!(rules.kind, kind);
            assert!(!rules.payment_methods.is_empty());
            assert!(rules.min_amount_cents < rules.max_amount_cents);
        }
    }

    #[test]
    fn restricted_state_check_ignores_case() {
        let rules = VendorKind::Radius.rules();
        assert!(rules.is_restricted_state("wi"));
        assert!(rules.is_restricted_state(" VT "));
        assert!(!rules.is_restricted_state("CA"));
        assert!(!VendorKind::ImportSale.rules().is_restricted_state("WI"));
    }

    #[test]
    fn bin_blocklist_matches_prefix() {
        let rules = VendorKind::Sempris.rules();
        assert!(rules.is_blocked_bin("4400661234567890"));
        assert!(!rules.is_blocked_bin("4111111111111111"));
    }

    #[test]
    fn payment_method_branching_differs_by_vendor() {
        assert!(!VendorKind::Radius.rules().accepts_method(PaymentMethod::Ach));
        assert!(VendorKind::Sempris.rules().accepts_method(PaymentMethod::Ach));
        assert!(!VendorKind::Mi.rules().accepts_brand(CardBrand::Discover));
        assert!(VendorKind::Sublytics.rules().accepts_country("ca"));
    }
}
