//! Registry of the platform's entity kinds.
//!
//! Each kind owns exactly one short code. Entity-creation paths should allocate
//! through [`EntityKind`] rather than raw strings so a typo cannot silently start
//! a new counter.

use crate::code::EntityCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string names no registered entity kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown entity kind: {0}")]
pub struct UnknownEntityKind(String);

macro_rules! entity_kinds {
    ($($(#[$doc:meta])* $variant:ident => ($code:literal, $name:literal),)+) => {
        /// Known entity kinds and their ID prefixes.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum EntityKind {
            $($(#[$doc])* $variant,)+
        }

        impl EntityKind {
            /// Every registered kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// The short code used as ID prefix and counter key.
            #[must_use]
            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// `snake_case` name of the kind.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Look a kind up by its code.
            #[must_use]
            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Look a kind up by its `snake_case` name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

entity_kinds! {
    /// Registered user account.
    User => ("US", "user"),
    /// Event listing.
    Event => ("EV", "event"),
    /// Blog post.
    Blog => ("BL", "blog"),
    /// Advert campaign.
    Advert => ("AD", "advert"),
    /// Hobby tag.
    Hobby => ("HB", "hobby"),
    /// Paid subscription.
    Subscription => ("SB", "subscription"),
    /// Ticket bought without an account.
    GuestTicket => ("GT", "guest_ticket"),
    /// Notification.
    Notification => ("NT", "notification"),
    /// Shop product.
    Product => ("PR", "product"),
    /// Shopping cart.
    Cart => ("CT", "cart"),
    /// Purchase history entry.
    PurchaseHistory => ("PH", "purchase_history"),
    /// Event category.
    EventCategory => ("EC", "event_category"),
    /// Comment on a blog post.
    BlogComment => ("BC", "blog_comment"),
    /// Customer support request.
    CustomerSupport => ("CS", "customer_support"),
    /// Landing page details block.
    LandingPageDetails => ("LPD", "landing_page_details"),
    /// Rating given to an event host.
    EventHostRating => ("EHR", "event_host_rating"),
    /// Report filed against an event.
    EventReport => ("ER", "event_report"),
    /// In-app notification for a user.
    UserAppNotification => ("UAN", "user_app_notification"),
    /// Advert targeting region.
    AdvertRegion => ("ADR", "advert_region"),
    /// Advert targeting language.
    AdvertLanguage => ("ADL", "advert_language"),
    /// Advert daily budget option.
    AdvertDailyBudget => ("ADB", "advert_daily_budget"),
    /// Advert call-to-action option.
    AdvertCallToAction => ("ACTA", "advert_call_to_action"),
    /// Advert placement price.
    AdvertPlacementPrice => ("APP", "advert_placement_price"),
}

impl EntityKind {
    /// The code as a validated [`EntityCode`].
    #[must_use]
    pub fn entity_code(self) -> EntityCode {
        // Registry codes are checked by `every_code_is_a_valid_entity_code`.
        EntityCode::from_registry(self.code())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    /// Accepts either the code (`"EV"`) or the name (`"event"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .or_else(|| Self::from_name(s))
            .ok_or_else(|| UnknownEntityKind(s.to_string()))
    }
}

impl From<EntityKind> for EntityCode {
    fn from(kind: EntityKind) -> Self {
        kind.entity_code()
    }
}
