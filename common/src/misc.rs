use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Declares a closed set of string values stored as TEXT columns.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(UserRole {
    Administrator => "Administrator",
    Consumer => "Consumer",
});

string_enum!(AccountStatus {
    Active => "active",
    Inactive => "inactive",
    Suspended => "suspended",
});

string_enum!(ListingType {
    FixedPrice => "fixed_price",
    LiveAuction => "live_auction",
});

string_enum!(SellerType {
    Dealer => "dealer",
    Private => "private",
});

string_enum!(SponsoredPlan {
    Basic => "basic",
    Premium => "premium",
    Featured => "featured",
});

string_enum!(ListingStatus {
    Active => "active",
    Sold => "sold",
    Expired => "expired",
    Pending => "pending",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_text() {
        for listing_type in ListingType::ALL {
            assert_eq!(listing_type.as_str().parse::<ListingType>(), Ok(*listing_type));
        }
        assert_eq!("live_auction".parse(), Ok(ListingType::LiveAuction));
        assert!("auction".parse::<ListingType>().is_err());
        assert!("Consumer".parse::<UserRole>().is_ok());
        assert!("consumer".parse::<UserRole>().is_err());
    }

    #[test]
    fn serde_uses_stored_names() {
        let json = serde_json::to_string(&SponsoredPlan::Featured).unwrap();
        assert_eq!(json, "\"featured\"");
        let status: ListingStatus = serde_json::from_str("\"sold\"").unwrap();
        assert_eq!(status, ListingStatus::Sold);
    }
}
