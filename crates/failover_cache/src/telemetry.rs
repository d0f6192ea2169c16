// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events for cache activity.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    /// A stored value was returned.
    Hit,
    /// No value was stored.
    Miss,
    /// A stored value failed schema validation.
    Invalid,
    /// A loaded value was stored.
    Loaded,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Invalid => "cache.invalid",
            Self::Loaded => "cache.loaded",
        }
    }
}

pub(crate) fn record(hash: &str, key: &str, activity: CacheActivity) {
    let activity_name = activity.as_str();

    // Event levels are static, hence one macro arm per level.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(
                cache.hash = hash,
                cache.key = key,
                cache.activity = activity_name,
                "cache.event"
            )
        };
    }

    match activity {
        CacheActivity::Hit => emit_event!(debug),
        CacheActivity::Miss | CacheActivity::Loaded => emit_event!(info),
        CacheActivity::Invalid => emit_event!(warn),
    }
}
