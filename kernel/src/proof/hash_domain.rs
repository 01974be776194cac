//! Typed domain separators for canonical hashing.
//!
//! Every hash computed by the workspace selects a domain via [`HashDomain`].
//! Adding a domain is a single change here: the enum, `as_bytes()`, `ALL`
//! and `Display` are generated from the same macro invocation.

macro_rules! define_hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator for [`super::hash::canonical_hash`].
        ///
        /// Every variant maps to a unique, null-terminated byte string used as
        /// a SHA-256 prefix.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// The raw domain-separator bytes (null-terminated).
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// All domain variants in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => write!(f, stringify!($variant)), )+
                }
            }
        }
    };
}

define_hash_domains! {
    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Search state fingerprints (values of the state questions of a session copy).
    SearchState => b"TRIAGE::SEARCH_STATE::V1\0",

    /// Protocol digest over the canonical JSON export.
    Protocol => b"TRIAGE::PROTOCOL::V1\0",

    // -----------------------------------------------------------------------
    // Planner
    // -----------------------------------------------------------------------

    /// Path identity (ordered step ids) used in logs and benchmarks.
    PlannedPath => b"TRIAGE::PLANNED_PATH::V1\0",
}
