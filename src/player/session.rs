// src/player/session.rs

//! Runtime for live attempts.
//!
//! Each attempt is owned by one actor task. The actor also owns both
//! countdown timers (overall and per question), so HTTP commands and ticks
//! are applied strictly one after another. A countdown restarts a full tick
//! period after it is reset. Attempts nobody touches for the idle timeout
//! are dropped from the registry.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{RwLock, mpsc, oneshot},
    time::{Instant, Interval, MissedTickBehavior},
};

use super::{
    machine::{Attempt, Event, Participant, Phase},
    view::AttemptView,
};
use crate::{error::AppError, models::quiz::Quiz, store::Stores};

enum Message {
    Apply {
        event: Event,
        reply: oneshot::Sender<Result<AttemptView, AppError>>,
    },
    View(oneshot::Sender<AttemptView>),
    Snapshot(oneshot::Sender<Attempt>),
    Leave,
}

/// Cheap handle to a running attempt.
#[derive(Clone)]
pub struct AttemptHandle {
    tx: mpsc::Sender<Message>,
}

fn attempt_gone() -> AppError {
    AppError::NotFound("Attempt not found".to_string())
}

impl AttemptHandle {
    /// Applies a participant event and returns the updated view.
    pub async fn apply(&self, event: Event) -> Result<AttemptView, AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Apply { event, reply })
            .await
            .map_err(|_| attempt_gone())?;
        rx.await.map_err(|_| attempt_gone())?
    }

    pub async fn view(&self) -> Result<AttemptView, AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::View(reply))
            .await
            .map_err(|_| attempt_gone())?;
        rx.await.map_err(|_| attempt_gone())
    }

    /// A copy of the attempt as it is right now.
    pub async fn snapshot(&self) -> Result<Attempt, AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Snapshot(reply))
            .await
            .map_err(|_| attempt_gone())?;
        rx.await.map_err(|_| attempt_gone())
    }
}

type Attempts = Arc<RwLock<HashMap<String, AttemptHandle>>>;

/// All attempts currently being played, by id.
#[derive(Clone)]
pub struct PlayerRegistry {
    attempts: Attempts,
    tick: Duration,
    idle_timeout: Duration,
}

impl PlayerRegistry {
    /// `tick` is the countdown period; attempts without any request for
    /// `idle_timeout` are dropped.
    pub fn new(tick: Duration, idle_timeout: Duration) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            tick,
            idle_timeout,
        }
    }

    /// Starts an attempt and spawns its actor.
    pub async fn start(
        &self,
        quiz: Quiz,
        participant: Option<Participant>,
        stores: Stores,
    ) -> AttemptView {
        let id = uuid::Uuid::new_v4().to_string();
        let attempt = Attempt::start(id.clone(), quiz, participant);
        let view = AttemptView::from(&attempt);

        tracing::info!(
            "Attempt {} started on quiz {} ({:?})",
            id,
            attempt.quiz().id,
            attempt.phase()
        );

        let (tx, rx) = mpsc::channel(32);
        // Registered before the actor runs so an early expiry finds its entry
        self.attempts
            .write()
            .await
            .insert(id, AttemptHandle { tx });

        let actor = AttemptActor {
            attempt,
            stores,
            attempts: self.attempts.clone(),
            overall: countdown(self.tick),
            question: countdown(self.tick),
            idle_timeout: self.idle_timeout,
        };
        tokio::spawn(actor.run(rx));
        view
    }

    pub async fn get(&self, id: &str) -> Result<AttemptHandle, AppError> {
        self.attempts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(attempt_gone)
    }

    /// Drops the attempt and stops its timers.
    pub async fn leave(&self, id: &str) -> Result<(), AppError> {
        let handle = self
            .attempts
            .write()
            .await
            .remove(id)
            .ok_or_else(attempt_gone)?;
        // The actor may already be gone; nothing left to stop then
        let _ = handle.tx.send(Message::Leave).await;
        tracing::info!("Attempt {} left", id);
        Ok(())
    }
}

/// Interval whose first tick lands one full period from now.
fn countdown(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

struct AttemptActor {
    attempt: Attempt,
    stores: Stores,
    attempts: Attempts,
    overall: Interval,
    question: Interval,
    idle_timeout: Duration,
}

impl AttemptActor {
    async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        let idle = tokio::time::sleep(self.idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                message = rx.recv() => {
                    let Some(message) = message else { break };
                    idle.as_mut().reset(Instant::now() + self.idle_timeout);
                    match message {
                        Message::Apply { event, reply } => {
                            let outcome = self
                                .step(event)
                                .await
                                .map(|_| AttemptView::from(&self.attempt));
                            let _ = reply.send(outcome);
                        }
                        Message::View(reply) => {
                            let _ = reply.send(AttemptView::from(&self.attempt));
                        }
                        Message::Snapshot(reply) => {
                            let _ = reply.send(self.attempt.clone());
                        }
                        Message::Leave => break,
                    }
                }
                _ = self.overall.tick() => self.tick(Event::OverallTick).await,
                _ = self.question.tick() => self.tick(Event::QuestionTick).await,
                () = &mut idle => {
                    tracing::info!("Attempt {} expired after inactivity", self.attempt.id());
                    self.attempts.write().await.remove(self.attempt.id());
                    break;
                }
            }
        }
    }

    async fn tick(&mut self, event: Event) {
        if let Err(e) = self.step(event).await {
            tracing::warn!("Tick failed for {}: {:?}", self.attempt.id(), e);
        }
    }

    /// Applies one event and saves the result if the event completed the attempt.
    ///
    /// When the result cannot be saved the attempt is put back the way it
    /// was, so the same command or the next tick completes it again.
    async fn step(&mut self, event: Event) -> Result<(), AppError> {
        let before = self.attempt.clone();

        let completed = self
            .attempt
            .apply(event)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if let Some(result) = completed {
            if let Err(e) = self.stores.append_result(result).await {
                tracing::error!("Failed to save result of {}: {:?}", self.attempt.id(), e);
                self.attempt = before;
                return Err(e.into());
            }
            tracing::info!("Attempt {} completed", self.attempt.id());
        }

        self.restart_countdowns(&before);
        Ok(())
    }

    /// Restarts the countdowns the last event reset.
    fn restart_countdowns(&mut self, before: &Attempt) {
        if self.attempt.phase() != Phase::InProgress {
            return;
        }
        if before.phase() != Phase::InProgress {
            self.overall.reset();
            self.question.reset();
        } else if before.position() != self.attempt.position() {
            self.question.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        player::machine::tests::quiz_with,
        storage::{MemoryStorage, testing::FlakyStorage},
    };

    fn stores() -> Stores {
        Stores::new(Arc::new(MemoryStorage::new()))
    }

    fn registry() -> PlayerRegistry {
        PlayerRegistry::new(Duration::from_secs(1), Duration::from_secs(3_600))
    }

    fn alice() -> Participant {
        Participant {
            user_id: "u1".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_countdown_completes_attempt() {
        let stores = stores();
        let registry = registry();
        let mut quiz = quiz_with(&[0, 1]);
        quiz.time_limit = Some(1);

        let view = registry.start(quiz, Some(alice()), stores.clone()).await;
        assert_eq!(view.time_left, Some(60));

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        let handle = registry.get(&view.id).await.unwrap();
        let halfway = handle.view().await.unwrap();
        assert_eq!(halfway.phase, Phase::InProgress);
        assert_eq!(halfway.time_left, Some(30));

        tokio::time::sleep(Duration::from_secs(31)).await;
        let done = handle.view().await.unwrap();
        assert_eq!(done.phase, Phase::Completed);
        assert_eq!(done.summary.as_ref().unwrap().score, 0);

        let results = stores.results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].answers.len(), 2);
        assert!(results[0].answers.iter().all(|a| a.selected_answer.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_question_countdown_advances() {
        let registry = registry();
        let mut quiz = quiz_with(&[0, 1]);
        quiz.questions[0].time_limit = Some(5);

        let view = registry.start(quiz, Some(alice()), stores()).await;
        let handle = registry.get(&view.id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        let moved = handle.view().await.unwrap();
        assert_eq!(moved.question.unwrap().number, 2);
    }

    #[tokio::test]
    async fn test_apply_and_persist() {
        let stores = stores();
        let registry = registry();
        let view = registry.start(quiz_with(&[2]), Some(alice()), stores.clone()).await;
        let handle = registry.get(&view.id).await.unwrap();

        assert!(handle.apply(Event::Advance).await.is_err());
        handle.apply(Event::Select(2)).await.unwrap();
        let done = handle.apply(Event::Advance).await.unwrap();
        assert_eq!(done.phase, Phase::Completed);
        assert_eq!(stores.results().await.unwrap()[0].score, 1);
    }

    #[tokio::test]
    async fn test_leave_removes_attempt() {
        let registry = registry();
        let view = registry.start(quiz_with(&[0]), Some(alice()), stores()).await;
        registry.leave(&view.id).await.unwrap();
        assert!(registry.get(&view.id).await.is_err());
        assert!(registry.leave(&view.id).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_advance_restarts_question_countdown() {
        let stores = stores();
        let registry = registry();
        let mut quiz = quiz_with(&[0, 1]);
        quiz.questions[1].time_limit = Some(1);

        let view = registry.start(quiz, Some(alice()), stores.clone()).await;
        let handle = registry.get(&view.id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(900)).await;
        handle.apply(Event::Select(0)).await.unwrap();
        let second = handle.apply(Event::Advance).await.unwrap();
        assert_eq!(second.question.as_ref().unwrap().number, 2);
        assert_eq!(second.question_time_left, Some(1));

        // Most of a second later the 1-second question is still on screen
        tokio::time::sleep(Duration::from_millis(950)).await;
        let still = handle.view().await.unwrap();
        assert_eq!(still.phase, Phase::InProgress);
        assert_eq!(still.question.unwrap().number, 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let done = handle.view().await.unwrap();
        assert_eq!(done.phase, Phase::Completed);
        assert_eq!(stores.results().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_participant_submit_starts_countdown_fresh() {
        let registry = registry();
        let mut quiz = quiz_with(&[0, 1]);
        quiz.questions[0].time_limit = Some(2);

        let view = registry.start(quiz, None, stores()).await;
        let handle = registry.get(&view.id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_700)).await;
        handle
            .apply(Event::SubmitParticipant {
                name: "Guest".to_string(),
                email: "guest@example.com".to_string(),
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1_900)).await;
        let first = handle.view().await.unwrap();
        assert_eq!(first.question.unwrap().number, 1);
        assert_eq!(first.question_time_left, Some(1));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let moved = handle.view().await.unwrap();
        assert_eq!(moved.question.unwrap().number, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_attempt_is_dropped() {
        let registry = PlayerRegistry::new(Duration::from_secs(1), Duration::from_secs(60));
        let view = registry.start(quiz_with(&[0]), None, stores()).await;
        let handle = registry.get(&view.id).await.unwrap();

        // Any request keeps it alive
        tokio::time::sleep(Duration::from_secs(40)).await;
        handle.view().await.unwrap();
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(registry.get(&view.id).await.is_ok());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(registry.get(&view.id).await.is_err());
        assert!(handle.view().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_attempt_is_dropped_after_idle_timeout() {
        let registry = PlayerRegistry::new(Duration::from_secs(1), Duration::from_secs(60));
        let view = registry.start(quiz_with(&[1]), Some(alice()), stores()).await;
        let handle = registry.get(&view.id).await.unwrap();

        handle.apply(Event::Select(1)).await.unwrap();
        handle.apply(Event::Advance).await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(registry.get(&view.id).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_attempt_in_progress() {
        let storage = FlakyStorage::new("results");
        let stores = Stores::new(Arc::new(storage.clone()));
        let registry = registry();
        let view = registry.start(quiz_with(&[2]), Some(alice()), stores.clone()).await;
        let handle = registry.get(&view.id).await.unwrap();

        handle.apply(Event::Select(2)).await.unwrap();
        let err = handle.apply(Event::Advance).await.unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(_)));

        let after = handle.view().await.unwrap();
        assert_eq!(after.phase, Phase::InProgress);
        assert!(after.summary.is_none());
        assert!(stores.results().await.unwrap().is_empty());

        storage.set_failing(false);
        let done = handle.apply(Event::Advance).await.unwrap();
        assert_eq!(done.phase, Phase::Completed);
        let results = stores.results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(done.summary.unwrap().result_id, results[0].id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_retries_failed_save() {
        let storage = FlakyStorage::new("results");
        let stores = Stores::new(Arc::new(storage.clone()));
        let registry = registry();
        let mut quiz = quiz_with(&[0]);
        quiz.time_limit = Some(1);

        let view = registry.start(quiz, Some(alice()), stores.clone()).await;
        let handle = registry.get(&view.id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60_500)).await;
        let pending = handle.view().await.unwrap();
        assert_eq!(pending.phase, Phase::InProgress);
        assert_eq!(pending.time_left, Some(1));

        storage.set_failing(false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.view().await.unwrap().phase, Phase::Completed);
        assert_eq!(stores.results().await.unwrap().len(), 1);
    }
}
