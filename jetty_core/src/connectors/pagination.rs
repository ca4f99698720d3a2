//! Resumable pagination state.
//!
//! A single logical listing ("all grants on this role") may span many
//! upstream calls and several upstream collections. The [`Bag`] is a stack
//! of [`PageState`] frames that records where the listing is. It is handed
//! to the caller as an opaque token after every call and handed back on the
//! next one; the top frame always names what is being listed right now.
//!
//! Frames are visited in stack order (last pushed, first visited). Within a
//! frame, pages follow the upstream cursor.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::SyncError;

/// Leading byte of every encoded token.
const TOKEN_VERSION: u8 = 1;

/// One frame of a traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    /// The resource type being listed.
    pub resource_type_id: String,
    /// The resource the listing is scoped to, if any.
    pub resource_id: Option<String>,
    /// The upstream cursor for the next page, if one was issued.
    pub token: Option<String>,
}

impl PageState {
    /// A fresh frame for the given resource type.
    pub fn new(resource_type_id: impl Into<String>) -> Self {
        Self {
            resource_type_id: resource_type_id.into(),
            ..Default::default()
        }
    }

    /// A fresh frame scoped to a resource.
    pub fn scoped(resource_type_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type_id: resource_type_id.into(),
            resource_id: Some(resource_id.into()),
            token: None,
        }
    }
}

/// A stack of pending traversal states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bag {
    states: Vec<PageState>,
}

impl Bag {
    /// Decode `token`. When the token holds no frames (including the empty
    /// token), `default_state` is pushed so there is always a current frame.
    pub fn parse(token: &str, default_state: PageState) -> Result<Self> {
        let mut bag = Self::unmarshal(token)?;
        if bag.states.is_empty() {
            bag.push(default_state);
        }
        Ok(bag)
    }

    /// Decode a token produced by [`Bag::marshal`].
    pub fn unmarshal(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Ok(Self::default());
        }

        let raw = base64::decode_config(token, base64::URL_SAFE_NO_PAD)
            .map_err(|e| SyncError::InvalidPageToken(format!("not base64: {e}")))?;
        let (version, body) = raw
            .split_first()
            .ok_or_else(|| SyncError::InvalidPageToken("empty token body".to_owned()))?;
        if *version != TOKEN_VERSION {
            return Err(
                SyncError::InvalidPageToken(format!("unsupported token version {version}")).into(),
            );
        }

        let states: Vec<PageState> = bincode::deserialize(body)
            .map_err(|e| SyncError::InvalidPageToken(format!("undecodable frames: {e}")))?;
        Ok(Self { states })
    }

    /// Encode the stack. An empty stack encodes to the empty token, which
    /// tells the caller the traversal is done.
    pub fn marshal(&self) -> Result<String> {
        if self.states.is_empty() {
            return Ok(String::new());
        }

        let mut raw = vec![TOKEN_VERSION];
        raw.extend(bincode::serialize(&self.states)?);
        Ok(base64::encode_config(raw, base64::URL_SAFE_NO_PAD))
    }

    /// The frame being listed right now.
    pub fn current(&self) -> Option<&PageState> {
        self.states.last()
    }

    /// The resource type of the current frame.
    pub fn resource_type_id(&self) -> Option<&str> {
        self.current().map(|s| s.resource_type_id.as_str())
    }

    /// The resource the current frame is scoped to.
    pub fn resource_id(&self) -> Option<&str> {
        self.current().and_then(|s| s.resource_id.as_deref())
    }

    /// The upstream cursor of the current frame; empty for a first page.
    pub fn cursor(&self) -> &str {
        self.current()
            .and_then(|s| s.token.as_deref())
            .unwrap_or_default()
    }

    /// Queue a frame. It becomes the current frame.
    pub fn push(&mut self, state: PageState) {
        self.states.push(state);
    }

    /// Drop and return the current frame.
    pub fn pop(&mut self) -> Option<PageState> {
        self.states.pop()
    }

    /// Record the outcome of fetching the current frame's page: a non-empty
    /// cursor means the frame has more pages, an empty one means it is
    /// exhausted and is popped.
    pub fn next(&mut self, next_cursor: &str) {
        if next_cursor.is_empty() {
            self.pop();
        } else if let Some(current) = self.states.last_mut() {
            current.token = Some(next_cursor.to_owned());
        }
    }

    /// [`Bag::next`] followed by [`Bag::marshal`].
    pub fn advance(&mut self, next_cursor: &str) -> Result<String> {
        self.next(next_cursor);
        self.marshal()
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the traversal is done.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_yields_default_frame() -> Result<()> {
        let bag = Bag::parse("", PageState::new("user"))?;
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.resource_type_id(), Some("user"));
        assert_eq!(bag.cursor(), "");
        Ok(())
    }

    #[test]
    fn tokens_round_trip_after_every_step() -> Result<()> {
        let mut bag = Bag::parse("", PageState::scoped("role", "r1"))?;
        bag.pop();
        bag.push(PageState::new("group"));
        bag.push(PageState::new("user"));

        for cursor in ["c1", "c2", "", "g1", ""] {
            let token = bag.advance(cursor)?;
            assert_eq!(Bag::unmarshal(&token)?, bag);
        }
        assert!(bag.is_empty());
        Ok(())
    }

    #[test]
    fn token_carries_cursor_and_scope() -> Result<()> {
        let mut bag = Bag::parse("", PageState::scoped("function", "SOURCE"))?;
        let token = bag.advance("next-page")?;
        let bag = Bag::parse(&token, PageState::new("unused"))?;
        assert_eq!(bag.resource_type_id(), Some("function"));
        assert_eq!(bag.resource_id(), Some("SOURCE"));
        assert_eq!(bag.cursor(), "next-page");
        Ok(())
    }

    #[test]
    fn traversal_terminates_after_one_call_per_page() -> Result<()> {
        // Two kinds: users have 3 pages, groups have 2.
        let pages = |kind: &str, cursor: &str| -> &'static str {
            match (kind, cursor) {
                ("user", "") => "u2",
                ("user", "u2") => "u3",
                ("group", "") => "g2",
                _ => "",
            }
        };

        let mut bag = Bag::default();
        bag.push(PageState::new("group"));
        bag.push(PageState::new("user"));
        let mut token = bag.marshal()?;
        let mut visits = vec![];

        let mut calls = 0;
        while !token.is_empty() {
            calls += 1;
            let mut bag = Bag::unmarshal(&token)?;
            let kind = bag.resource_type_id().unwrap_or_default().to_owned();
            visits.push(kind.clone());
            let next = pages(&kind, bag.cursor());
            token = bag.advance(next)?;
        }

        assert_eq!(calls, 5);
        assert_eq!(visits, vec!["user", "user", "user", "group", "group"]);
        Ok(())
    }

    #[test]
    fn same_token_reaches_same_frame() -> Result<()> {
        let mut bag = Bag::default();
        bag.push(PageState::new("group"));
        bag.push(PageState::new("user"));
        let token = bag.marshal()?;

        let first = Bag::unmarshal(&token)?.advance("")?;
        let second = Bag::unmarshal(&token)?.advance("")?;
        assert_eq!(first, second);
        assert_eq!(Bag::unmarshal(&first)?.resource_type_id(), Some("group"));
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["not base64!", "AA", "Ag", "AQ"] {
            let err = Bag::unmarshal(token).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<SyncError>(),
                    Some(SyncError::InvalidPageToken(_))
                ),
                "{token}: {err}"
            );
        }
    }
}
