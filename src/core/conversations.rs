//! # Conversation List
//!
//! Recent conversations for the signed-in user, plus user search.
//!
//! Refreshes and searches can overlap (a poll tick fires while the previous
//! request is still out, or the user types faster than the server answers).
//! Every request carries a sequence number and a response is applied only if
//! it is newer than the last one applied, so a slow answer never overwrites
//! a fresher one.

use log::debug;

use crate::api::{ApiError, ChatApi, ConversationSummary, User};

/// A request ticket: which response is the freshest.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Sequencer {
    issued: u64,
    applied: u64,
}

impl Sequencer {
    pub(crate) fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Accept `seq` if nothing newer has been applied yet.
    pub(crate) fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        true
    }

    /// Keep numbering where this left off, but treat every ticket issued so
    /// far as stale.
    pub(crate) fn superseded(self) -> Self {
        Self { issued: self.issued, applied: self.issued }
    }
}

/// What the list pane currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    SearchResults,
    Conversations,
    Discover,
}

#[derive(Debug, Clone)]
pub struct ConversationList {
    me: String,
    limit: u32,
    pub query: String,
    pub conversations: Vec<ConversationSummary>,
    pub results: Vec<User>,
    pub discover: Vec<User>,
    pub selected: usize,
    refreshes: Sequencer,
    searches: Sequencer,
}

/// Drop the requesting user from a list of users.
pub fn without_self(users: Vec<User>, me: &str) -> Vec<User> {
    users.into_iter().filter(|u| u.username != me).collect()
}

impl ConversationList {
    pub fn new(me: impl Into<String>, limit: u32) -> Self {
        Self {
            me: me.into(),
            limit,
            query: String::new(),
            conversations: Vec::new(),
            results: Vec::new(),
            discover: Vec::new(),
            selected: 0,
            refreshes: Sequencer::default(),
            searches: Sequencer::default(),
        }
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Record a new query. Returns the ticket for the search to issue, or
    /// `None` when the query is blank (results are cleared, no call is made).
    pub fn begin_search(&mut self, query: &str) -> Option<u64> {
        self.query = query.to_string();
        self.selected = 0;
        let seq = self.searches.issue();
        if query.trim().is_empty() {
            // Blank query supersedes any search still in flight.
            self.searches.accept(seq);
            self.results.clear();
            return None;
        }
        Some(seq)
    }

    /// Apply search results. Returns false for stale responses.
    pub fn apply_search(&mut self, seq: u64, result: Result<Vec<User>, ApiError>) -> Result<bool, ApiError> {
        if !self.searches.accept(seq) {
            debug!("Dropping stale search response #{}", seq);
            return Ok(false);
        }
        let users = result?;
        self.results = without_self(users, &self.me);
        self.clamp_selection();
        Ok(true)
    }

    pub async fn search(&mut self, api: &dyn ChatApi, query: &str) -> Result<&[User], ApiError> {
        if let Some(seq) = self.begin_search(query) {
            let result = api.search_users(query.trim()).await;
            self.apply_search(seq, result)?;
        }
        Ok(&self.results)
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    pub fn begin_refresh(&mut self) -> u64 {
        self.refreshes.issue()
    }

    pub fn apply_refresh(
        &mut self,
        seq: u64,
        result: Result<Vec<ConversationSummary>, ApiError>,
    ) -> Result<bool, ApiError> {
        if !self.refreshes.accept(seq) {
            debug!("Dropping stale conversation refresh #{}", seq);
            return Ok(false);
        }
        let conversations = result?;
        self.conversations = conversations
            .into_iter()
            .filter(|c| c.peer.username != self.me)
            .collect();
        self.clamp_selection();
        Ok(true)
    }

    pub async fn refresh(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let seq = self.begin_refresh();
        let result = api.conversations(&self.me, self.limit).await;
        self.apply_refresh(seq, result).map(|_| ())
    }

    // ------------------------------------------------------------------------
    // Discover
    // ------------------------------------------------------------------------

    pub fn apply_discover(&mut self, users: Vec<User>) {
        self.discover = without_self(users, &self.me);
        self.clamp_selection();
    }

    pub async fn discover(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let users = api.public_users().await?;
        self.apply_discover(users);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn source(&self) -> ListSource {
        if !self.query.trim().is_empty() {
            ListSource::SearchResults
        } else if !self.conversations.is_empty() || self.discover.is_empty() {
            ListSource::Conversations
        } else {
            ListSource::Discover
        }
    }

    /// Peers in display order for the current source.
    pub fn peers(&self) -> Vec<&User> {
        match self.source() {
            ListSource::SearchResults => self.results.iter().collect(),
            ListSource::Conversations => self.conversations.iter().map(|c| &c.peer).collect(),
            ListSource::Discover => self.discover.iter().collect(),
        }
    }

    pub fn select_next(&mut self) {
        let len = self.peers().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// The highlighted peer, if any.
    pub fn selected_peer(&self) -> Option<User> {
        self.peers().get(self.selected).map(|u| (*u).clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.peers().len();
        self.selected = if len == 0 { 0 } else { self.selected.min(len - 1) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeApi, summary, user};

    #[tokio::test]
    async fn test_search_excludes_self() {
        let api = FakeApi::new();
        for name in ["alice", "alicia", "bob"] {
            api.add_account(name, "pw");
        }
        let mut list = ConversationList::new("alice", 50);

        let results = list.search(&api, "ali").await.unwrap();
        let handles: Vec<_> = results.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(handles, vec!["alicia"]);
    }

    #[tokio::test]
    async fn test_blank_search_makes_no_call() {
        let api = FakeApi::new();
        let mut list = ConversationList::new("alice", 50);
        list.results = vec![user("bob")];

        let results = list.search(&api, "   ").await.unwrap();
        assert!(results.is_empty());
        assert_eq!(api.call_count(), 0);
    }

    #[test]
    fn test_stale_search_is_dropped() {
        let mut list = ConversationList::new("alice", 50);
        let first = list.begin_search("b").unwrap();
        let second = list.begin_search("bo").unwrap();

        assert_eq!(list.apply_search(second, Ok(vec![user("bob")])), Ok(true));
        assert_eq!(list.apply_search(first, Ok(vec![user("bea"), user("bill")])), Ok(false));
        assert_eq!(list.results, vec![user("bob")]);
    }

    #[test]
    fn test_blank_query_supersedes_inflight_search() {
        let mut list = ConversationList::new("alice", 50);
        let seq = list.begin_search("bo").unwrap();
        assert_eq!(list.begin_search(""), None);
        assert_eq!(list.apply_search(seq, Ok(vec![user("bob")])), Ok(false));
        assert!(list.results.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_list() {
        let api = FakeApi::new();
        api.add_account("alice", "pw");
        api.add_account("bob", "pw");
        api.seed_text("bob", "alice", "yo");
        let mut list = ConversationList::new("alice", 50);
        list.conversations = vec![summary("zed")];

        list.refresh(&api).await.unwrap();
        assert_eq!(list.conversations.len(), 1);
        assert_eq!(list.conversations[0].peer.username, "bob");
        assert_eq!(list.source(), ListSource::Conversations);
    }

    #[test]
    fn test_stale_refresh_is_dropped() {
        let mut list = ConversationList::new("alice", 50);
        let old = list.begin_refresh();
        let new = list.begin_refresh();
        assert_eq!(list.apply_refresh(new, Ok(vec![summary("bob")])), Ok(true));
        assert_eq!(list.apply_refresh(old, Ok(vec![])), Ok(false));
        assert_eq!(list.conversations.len(), 1);
    }

    #[test]
    fn test_failed_refresh_keeps_list() {
        let mut list = ConversationList::new("alice", 50);
        list.conversations = vec![summary("bob")];
        let seq = list.begin_refresh();
        let err = ApiError::NetworkUnreachable { host: "h:1".to_string() };
        assert_eq!(list.apply_refresh(seq, Err(err.clone())), Err(err));
        assert_eq!(list.conversations.len(), 1);
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let mut list = ConversationList::new("alice", 50);
        let old = list.begin_refresh();
        let new = list.begin_refresh();
        assert_eq!(list.apply_refresh(new, Ok(vec![summary("bob")])), Ok(true));

        let err = ApiError::NetworkUnreachable { host: "h:1".to_string() };
        assert_eq!(list.apply_refresh(old, Err(err.clone())), Ok(false));

        let first = list.begin_search("b").unwrap();
        let second = list.begin_search("bo").unwrap();
        assert_eq!(list.apply_search(second, Ok(vec![user("bob")])), Ok(true));
        assert_eq!(list.apply_search(first, Err(err)), Ok(false));
        assert_eq!(list.results, vec![user("bob")]);
    }

    #[test]
    fn test_discover_shown_when_no_conversations() {
        let mut list = ConversationList::new("alice", 50);
        list.apply_discover(vec![user("alice"), user("bob"), user("carol")]);
        assert_eq!(list.source(), ListSource::Discover);
        let handles: Vec<_> = list.peers().iter().map(|u| u.username.clone()).collect();
        assert_eq!(handles, vec!["bob", "carol"]);
    }

    #[test]
    fn test_selection_moves_and_clamps() {
        let mut list = ConversationList::new("alice", 50);
        list.apply_discover(vec![user("bob"), user("carol")]);
        list.select_next();
        list.select_next();
        assert_eq!(list.selected_peer().map(|u| u.username), Some("carol".to_string()));
        list.select_prev();
        assert_eq!(list.selected_peer().map(|u| u.username), Some("bob".to_string()));

        list.apply_discover(vec![]);
        assert_eq!(list.selected, 0);
        assert!(list.selected_peer().is_none());
    }
}
