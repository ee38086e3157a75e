//! Shared test double for the telephony control plane
//!
//! The fake keeps a live session set, records every call, and supports two
//! kinds of scripting: per-call `session_exists` results (to drive the
//! watcher's debounce deterministically) and a simulated remote agent that
//! writes survey data into the database the moment the dial goes out.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use autodial_dial_engine::prelude::*;
use autodial_telephony_core::Result as TelephonyResult;

/// One scripted answer to a `session_exists` query.
#[derive(Debug, Clone, Copy)]
pub enum ExistsStep {
    Present,
    Gone,
    /// Transient query failure; must not count toward the gone streak.
    Glitch,
}

#[derive(Default)]
struct State {
    sessions: HashSet<String>,
    create_calls: Vec<String>,
    dispatch_calls: Vec<(String, String)>,
    dial_calls: Vec<(String, String)>,
    delete_calls: Vec<String>,
    exists_script: VecDeque<ExistsStep>,
    exists_calls: usize,
    fail_dial_numbers: HashSet<String>,
    agent_script: Option<(DatabaseManager, SurveyUpdate)>,
}

#[derive(Default)]
pub struct FakeControlPlane {
    state: Mutex<State>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `session_exists` answers; once drained, the live session set
    /// answers instead.
    pub fn script_exists(&self, steps: impl IntoIterator<Item = ExistsStep>) {
        self.state.lock().unwrap().exists_script.extend(steps);
    }

    /// Make dial-out hard-fail for this destination.
    pub fn fail_dial_for(&self, phone_number: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_dial_numbers
            .insert(phone_number.to_string());
    }

    /// Simulate the remote agent: as soon as a dial goes out, apply this
    /// survey update to the attempt's call record.
    pub fn answer_with(&self, database: DatabaseManager, update: SurveyUpdate) {
        self.state.lock().unwrap().agent_script = Some((database, update));
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().create_calls.clone()
    }

    pub fn dial_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().dial_calls.clone()
    }

    pub fn dispatch_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().dispatch_calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn exists_call_count(&self) -> usize {
        self.state.lock().unwrap().exists_calls
    }
}

fn record_id_of(session_name: &str) -> Option<i64> {
    session_name.rsplit('_').next()?.parse().ok()
}

#[async_trait]
impl SessionControl for FakeControlPlane {
    async fn create_session(&self, name: &str) -> TelephonyResult<()> {
        let mut state = self.state.lock().unwrap();
        state.create_calls.push(name.to_string());
        state.sessions.insert(name.to_string());
        Ok(())
    }

    async fn dial_out(
        &self,
        session_name: &str,
        phone_number: &str,
        _caller_identity: &str,
        _display_name: &str,
    ) -> TelephonyResult<()> {
        let agent = {
            let mut state = self.state.lock().unwrap();
            state
                .dial_calls
                .push((session_name.to_string(), phone_number.to_string()));
            if state.fail_dial_numbers.contains(phone_number) {
                return Err(TelephonyError::Api {
                    status: 500,
                    message: "trunk rejected the call".to_string(),
                });
            }
            state.agent_script.clone()
        };

        if let Some((database, update)) = agent {
            let record_id = record_id_of(session_name)
                .expect("session names in tests embed the record id");
            database
                .apply_survey_update(record_id, &update)
                .await
                .expect("agent write should succeed");
        }
        Ok(())
    }

    async fn ensure_agent_joined(
        &self,
        session_name: &str,
        agent_name: &str,
    ) -> TelephonyResult<()> {
        self.state
            .lock()
            .unwrap()
            .dispatch_calls
            .push((session_name.to_string(), agent_name.to_string()));
        Ok(())
    }

    async fn session_exists(&self, name: &str) -> TelephonyResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.exists_calls += 1;
        match state.exists_script.pop_front() {
            Some(ExistsStep::Present) => Ok(true),
            Some(ExistsStep::Gone) => Ok(false),
            Some(ExistsStep::Glitch) => Err(TelephonyError::Api {
                status: 503,
                message: "temporarily unavailable".to_string(),
            }),
            None => Ok(state.sessions.contains(name)),
        }
    }

    async fn delete_session(&self, name: &str) -> TelephonyResult<()> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(name.to_string());
        state.sessions.remove(name);
        Ok(())
    }
}
