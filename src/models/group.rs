// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Groups of users sharing order visibility and vendor access.

use crate::vendors::VendorKind;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Group stored in Firestore (`groups/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Vendors members may submit to. Empty means every vendor.
    #[serde(default)]
    pub allowed_vendors: Vec<VendorKind>,
    pub created_at: String,
    pub updated_at: String,
}

impl Group {
    pub fn allows(&self, vendor: VendorKind) -> bool {
        self.allowed_vendors.is_empty() || self.allowed_vendors.contains(&vendor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(vendors: Vec<VendorKind>) -> Group {
        Group {
            id: "g".to_string(),
            name: "Sales".to_string(),
            description: String::new(),
            allowed_vendors: vendors,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn empty_vendor_list_allows_all() {
        let g = group(vec![]);
        for kind in VendorKind::ALL {
            assert!(g.allows(kind));
        }
    }

    #[test]
    fn vendor_list_restricts() {
        let g = group(vec![VendorKind::Radius, VendorKind::Mi]);
        assert!(g.allows(VendorKind::Radius));
        assert!(g.allows(VendorKind::Mi));
        assert!(!g.allows(VendorKind::Sempris));
    }
}
