use super::{ScoreStore, StoreError};
use crate::types::{ResponseId, SubscriberId, Vote, VoteValue, VoterId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicI64, Ordering},
};

#[derive(Debug, Clone)]
struct ResponseRow {
    created_at: DateTime<Utc>,
    author: Option<SubscriberId>,
    votes: Vec<Vote>,
}

/// Score store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryScoreStore {
    responses: RwLock<BTreeMap<ResponseId, ResponseRow>>,
    next_vote_id: AtomicI64,
}

impl InMemoryScoreStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a response without votes.
    pub fn insert_response(
        &self,
        response_id: ResponseId,
        created_at: DateTime<Utc>,
        author: Option<SubscriberId>,
    ) {
        self.responses
            .write()
            .insert(response_id, ResponseRow { created_at, author, votes: Vec::new() });
    }

    /// Appends a vote. Returns `false` when the response does not exist.
    pub fn record_vote(
        &self,
        response_id: ResponseId,
        voter_id: VoterId,
        value: VoteValue,
        created_at: DateTime<Utc>,
    ) -> bool {
        let mut responses = self.responses.write();
        let Some(row) = responses.get_mut(&response_id) else {
            return false;
        };
        let id = self.next_vote_id.fetch_add(1, Ordering::Relaxed) + 1;
        row.votes.push(Vote { id, response_id, voter_id, value, created_at });
        true
    }

    #[must_use]
    pub fn vote_count(&self) -> usize {
        self.responses.read().values().map(|row| row.votes.len()).sum()
    }
}

#[async_trait]
impl ScoreStore for InMemoryScoreStore {
    async fn list_votes(&self, response_id: ResponseId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.responses.read().get(&response_id).map(|row| row.votes.clone()).unwrap_or_default())
    }

    async fn get_response_created_at(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.responses.read().get(&response_id).map(|row| row.created_at))
    }

    async fn list_candidate_responses(&self) -> Result<Vec<ResponseId>, StoreError> {
        Ok(self
            .responses
            .read()
            .iter()
            .filter(|(_, row)| !row.votes.is_empty())
            .map(|(id, _)| *id)
            .collect())
    }

    async fn get_response_author(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<SubscriberId>, StoreError> {
        Ok(self.responses.read().get(&response_id).and_then(|row| row.author))
    }
}
