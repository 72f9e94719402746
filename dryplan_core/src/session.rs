//! Async chat session around the conversation state machine.
//!
//! The state machine itself is synchronous; this layer adds the
//! conversational pacing and persistence on top:
//! - replies are delivered by a single worker task fed through an
//!   unbounded queue, so they always land in order and none are
//!   dropped under a burst of input
//! - each reply is delayed (a short pause for ordinary prompts, a
//!   longer one after plan generation) to read as typing
//! - transcript saves are debounced: every appended message reschedules
//!   one pending save task instead of writing per message
//! - shutdown drains the queue and flushes the transcript

use crate::conversation::{Conversation, Effect, ReplyDelay, Turn};
use crate::ports::{ConversationStore, GoalsStore, ProfileStore, ReminderSchedule, Translator};
use crate::{ConversationMessage, Error, ProfileDraft, Result, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One unit of work for the reply worker
struct ReplyJob {
    replies: Vec<ConversationMessage>,
    delay: ReplyDelay,
    effects: Vec<Effect>,
}

struct SessionState {
    conversation: Conversation,
    transcript: Vec<ConversationMessage>,
    title: String,
}

struct SessionInner {
    id: Uuid,
    config: SessionConfig,
    state: Mutex<SessionState>,
    save_task: Mutex<Option<JoinHandle<()>>>,
    conversations: Arc<dyn ConversationStore>,
    profiles: Arc<dyn ProfileStore>,
    goals: Arc<dyn GoalsStore>,
    reminders: Arc<dyn ReminderSchedule>,
    translator: Arc<dyn Translator>,
}

/// A live chat session bound to one stored conversation
pub struct ChatSession {
    inner: Arc<SessionInner>,
    jobs: Mutex<Option<mpsc::UnboundedSender<ReplyJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    /// Open an interactive session: fetch the profile snapshot (a
    /// fetch failure degrades to the from-scratch flow), create the
    /// stored conversation and post the opening messages.
    pub async fn open(
        config: SessionConfig,
        engine_config: crate::Config,
        conversations: Arc<dyn ConversationStore>,
        profiles: Arc<dyn ProfileStore>,
        goals: Arc<dyn GoalsStore>,
        reminders: Arc<dyn ReminderSchedule>,
        translator: Arc<dyn Translator>,
    ) -> Result<Self> {
        let snapshot = match profiles.fetch_profile().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed, starting from scratch");
                None
            }
        };

        let (conversation, opening) =
            Conversation::start(engine_config, snapshot, translator.as_ref());

        Self::build(
            config,
            conversation,
            opening,
            Vec::new(),
            conversations,
            profiles,
            goals,
            reminders,
            translator,
        )
        .await
    }

    /// Open a weekly auto-update session: no questions, regenerate the
    /// dry plan for the reminder's current week from the stored draft.
    pub async fn open_auto_update(
        config: SessionConfig,
        engine_config: crate::Config,
        draft: ProfileDraft,
        conversations: Arc<dyn ConversationStore>,
        profiles: Arc<dyn ProfileStore>,
        goals: Arc<dyn GoalsStore>,
        reminders: Arc<dyn ReminderSchedule>,
        translator: Arc<dyn Translator>,
    ) -> Result<Self> {
        let week = match reminders.week_number().await {
            Ok(week) => week,
            Err(e) => {
                tracing::warn!(error = %e, "week lookup failed, assuming week 1");
                1
            }
        };

        let (conversation, opening, effects) =
            Conversation::start_auto_update(engine_config, draft, week, translator.as_ref());

        Self::build(
            config,
            conversation,
            opening,
            effects,
            conversations,
            profiles,
            goals,
            reminders,
            translator,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn build(
        config: SessionConfig,
        conversation: Conversation,
        opening: Vec<ConversationMessage>,
        opening_effects: Vec<Effect>,
        conversations: Arc<dyn ConversationStore>,
        profiles: Arc<dyn ProfileStore>,
        goals: Arc<dyn GoalsStore>,
        reminders: Arc<dyn ReminderSchedule>,
        translator: Arc<dyn Translator>,
    ) -> Result<Self> {
        let title = translator.translate("chat.title");
        let id = conversations
            .create_conversation("dry_plan")
            .await
            .map_err(|e| Error::Port(e.to_string()))?;

        let inner = Arc::new(SessionInner {
            id,
            config,
            state: Mutex::new(SessionState {
                conversation,
                transcript: opening,
                title,
            }),
            save_task: Mutex::new(None),
            conversations,
            profiles,
            goals,
            reminders,
            translator,
        });

        for effect in opening_effects {
            run_effect(&inner, effect).await;
        }
        schedule_save(&inner).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(reply_worker(Arc::clone(&inner), rx));

        tracing::info!(conversation_id = %id, "chat session opened");
        Ok(Self {
            inner,
            jobs: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Handle one user input. The user message lands in the transcript
    /// immediately; the replies are queued for delayed delivery.
    pub async fn send(&self, value: &str, display_text: &str) {
        let turn: Turn = {
            let mut state = self.inner.state.lock().await;
            let turn = state.conversation.process_answer(
                value,
                display_text,
                self.inner.translator.as_ref(),
            );
            state.transcript.push(turn.user_message.clone());
            turn
        };
        schedule_save(&self.inner).await;

        let jobs = self.jobs.lock().await;
        if let Some(tx) = jobs.as_ref() {
            // Unbounded: a typing burst queues up, nothing is dropped
            let _ = tx.send(ReplyJob {
                replies: turn.replies,
                delay: turn.delay,
                effects: turn.effects,
            });
        }
    }

    /// Apply the last generated KBJU goals to the tracker. A rejected
    /// or failed update becomes a chat message; the session state is
    /// left intact either way.
    pub async fn apply_goals(&self) -> bool {
        let goals = {
            let state = self.inner.state.lock().await;
            state.conversation.current_goals()
        };
        let Some(goals) = goals else {
            return false;
        };

        let applied = matches!(self.inner.goals.update_goals(goals).await, Ok(true));

        {
            let mut state = self.inner.state.lock().await;
            if applied {
                if let Some(message) = state
                    .transcript
                    .iter_mut()
                    .rev()
                    .find(|m| m.apply_kbju.is_some())
                {
                    message.applied = true;
                }
            } else {
                tracing::warn!("goal update rejected by the tracker");
                state.transcript.push(ConversationMessage::bot(
                    self.inner.translator.translate("chat.goals_apply_failed"),
                ));
            }
        }
        schedule_save(&self.inner).await;
        applied
    }

    /// Current transcript snapshot
    pub async fn transcript(&self) -> Vec<ConversationMessage> {
        self.inner.state.lock().await.transcript.clone()
    }

    /// Drain the reply queue, cancel the pending debounce and write
    /// the transcript out.
    pub async fn shutdown(&self) {
        // Closing the channel lets the worker finish the queued jobs
        // and exit.
        self.jobs.lock().await.take();
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "reply worker ended abnormally");
            }
        }

        if let Some(save) = self.inner.save_task.lock().await.take() {
            save.abort();
        }
        save_now(&self.inner).await;
        tracing::info!(conversation_id = %self.inner.id, "chat session closed");
    }
}

/// Serial reply delivery: one job at a time, in arrival order
async fn reply_worker(inner: Arc<SessionInner>, mut rx: mpsc::UnboundedReceiver<ReplyJob>) {
    while let Some(job) = rx.recv().await {
        let delay_ms = match job.delay {
            ReplyDelay::Short => inner.config.short_reply_ms,
            ReplyDelay::Analysis => inner.config.analysis_reply_ms,
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        {
            let mut state = inner.state.lock().await;
            state.transcript.extend(job.replies);
        }
        for effect in job.effects {
            run_effect(&inner, effect).await;
        }
        schedule_save(&inner).await;
    }
}

/// Run one post-turn side effect. Port failures are reported in the
/// transcript or the log, never propagated into the state machine.
async fn run_effect(inner: &Arc<SessionInner>, effect: Effect) {
    match effect {
        Effect::SaveProfile {
            update,
            weight_changed,
        } => {
            let weight = update.weight_kg;
            let saved = matches!(inner.profiles.update_profile(update).await, Ok(true));
            if !saved {
                tracing::warn!("profile update rejected");
                let mut state = inner.state.lock().await;
                state.transcript.push(ConversationMessage::bot(
                    inner.translator.translate("chat.profile_save_failed"),
                ));
                return;
            }
            if weight_changed {
                if let Some(weight) = weight {
                    if let Err(e) = inner.profiles.add_weight(weight, None).await {
                        tracing::warn!(error = %e, "weight history entry failed");
                    }
                }
            }
        }
        Effect::DryPlanGenerated { week } => {
            let result = if week <= 1 {
                inner.reminders.activate().await
            } else {
                inner.reminders.mark_updated().await
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, week, "reminder schedule update failed");
            }
        }
    }
}

/// Abort the pending save and schedule a fresh one after the debounce
/// window. Consecutive appends collapse into a single write.
async fn schedule_save(inner: &Arc<SessionInner>) {
    let mut slot = inner.save_task.lock().await;
    if let Some(previous) = slot.take() {
        previous.abort();
    }

    let inner = Arc::clone(inner);
    let debounce = Duration::from_millis(inner.config.save_debounce_ms);
    *slot = Some(tokio::spawn(async move {
        tokio::time::sleep(debounce).await;
        save_now(&inner).await;
    }));
}

async fn save_now(inner: &Arc<SessionInner>) {
    let (messages, title) = {
        let state = inner.state.lock().await;
        (state.transcript.clone(), state.title.clone())
    };
    if let Err(e) = inner
        .conversations
        .save_messages(inner.id, messages, &title)
        .await
    {
        tracing::warn!(error = %e, "transcript save failed");
    }
}
