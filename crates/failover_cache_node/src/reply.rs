// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A decoded reply from a store node.
///
/// Responses are always decoded to text; binary payloads are a backend
/// concern and never reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The key or field does not exist.
    Nil,
    /// A status acknowledgement.
    Ok,
    /// An integer reply.
    Int(i64),
    /// A text reply.
    Text(String),
    /// A list of replies.
    List(Vec<Reply>),
}

impl Reply {
    /// Converts a reply to a single optional text value.
    ///
    /// `Nil` becomes `None` and `Text` becomes `Some`. Any other reply is
    /// returned unchanged as the error value.
    ///
    /// # Errors
    ///
    /// Returns the reply itself if it is neither `Nil` nor `Text`.
    ///
    /// # Examples
    ///
    /// ```
    /// use failover_cache_node::Reply;
    ///
    /// assert_eq!(Reply::Nil.into_optional_text(), Ok(None));
    /// assert_eq!(Reply::Text("v".into()).into_optional_text(), Ok(Some("v".to_string())));
    /// assert_eq!(Reply::Int(1).into_optional_text(), Err(Reply::Int(1)));
    /// ```
    pub fn into_optional_text(self) -> Result<Option<String>, Self> {
        match self {
            Self::Nil => Ok(None),
            Self::Text(text) => Ok(Some(text)),
            other => Err(other),
        }
    }

    /// Returns the integer value of an `Int` reply.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns `true` for `Nil`.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

impl From<Option<String>> for Reply {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Nil, Self::Text)
    }
}
