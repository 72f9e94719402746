//! Conversation state machine for the dry-plan data collection flow.
//!
//! A linear chain of profile questions with two branch points (profile
//! confirmation and single-field editing), per-step guard validation,
//! and a terminal free-chat state where every message runs through
//! moderation, the correction engine and the topic matcher in that
//! order. The machine itself is synchronous and pure; simulated reply
//! latency and transcript persistence live in the session layer.

use crate::{
    correction, energy, moderation, plan, topics, AnalysisSection, BmiCategory, Config,
    ConversationMessage, DayPlan, EnergyTarget, ExclusionCategory, Gender, Goal, KbjuGoals,
    MessageOption, ProfileDraft, ProfileSnapshot, ProfileUpdate, Translator,
};
use crate::{catalog, ActivityLevel};
use std::collections::BTreeSet;

/// Validation bounds for the collected profile fields
pub const AGE_RANGE: (u32, u32) = (14, 100);
pub const HEIGHT_RANGE: (f64, f64) = (100.0, 250.0);
pub const WEIGHT_RANGE: (f64, f64) = (30.0, 300.0);

/// States of the conversation, replacing the original numeric step
/// constants with an explicit enumerated type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// "Which field do you want to change?"
    SelectField,
    /// Confirm the pre-filled profile snapshot
    ConfirmProfile,
    Gender,
    Age,
    Height,
    Weight,
    Activity,
    Goal,
    TargetWeight,
    /// Offer to persist the (changed) draft before generating
    SaveProfile,
    /// Plan generated; free chat from here on
    Done,
}

/// A profile field reachable from the edit sub-path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditField {
    Gender,
    Age,
    Height,
    Weight,
}

/// Result of a per-step guard: advance or stay and re-prompt
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Advance(Step),
    Retry(String),
}

/// How long the session layer should pretend to "think"
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyDelay {
    Short,
    Analysis,
}

/// Side effect the session layer must run after a turn
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Persist the draft to the profile store; record weight history if
    /// the weight changed
    SaveProfile {
        update: ProfileUpdate,
        weight_changed: bool,
    },
    /// A dry plan was (re)generated for this week
    DryPlanGenerated { week: u32 },
}

/// Everything produced by one user turn
#[derive(Clone, Debug)]
pub struct Turn {
    pub user_message: ConversationMessage,
    pub replies: Vec<ConversationMessage>,
    pub delay: ReplyDelay,
    pub effects: Vec<Effect>,
}

/// Fixed-size ordered ring of quick-reply suggestions.
///
/// Three slots, oldest overwritten first - no array surgery on a
/// growing options vector.
#[derive(Clone, Debug, Default)]
pub struct OptionRing {
    slots: [Option<MessageOption>; 3],
    head: usize,
}

impl OptionRing {
    pub fn push(&mut self, option: MessageOption) {
        self.slots[self.head] = Some(option);
        self.head = (self.head + 1) % self.slots.len();
    }

    /// Current suggestions, oldest first
    pub fn as_options(&self) -> Vec<MessageOption> {
        let n = self.slots.len();
        (0..n)
            .map(|i| &self.slots[(self.head + i) % n])
            .filter_map(|slot| slot.clone())
            .collect()
    }
}

/// The result bundle kept for follow-up corrections and KBJU apply
#[derive(Clone, Debug)]
struct GeneratedResults {
    plan: Vec<DayPlan>,
    goals: KbjuGoals,
}

/// The conversation state machine
pub struct Conversation {
    config: Config,
    step: Step,
    draft: ProfileDraft,
    snapshot: Option<ProfileSnapshot>,
    /// Single-field edit in progress: return to Activity afterwards
    editing_single: bool,
    week_number: u32,
    results: Option<GeneratedResults>,
    ring: OptionRing,
}

impl Conversation {
    /// Start a conversation. With a fillable profile snapshot the flow
    /// skips straight to confirmation; otherwise it opens with the
    /// gender question.
    pub fn start(
        config: Config,
        snapshot: Option<ProfileSnapshot>,
        translator: &dyn Translator,
    ) -> (Self, Vec<ConversationMessage>) {
        let mut conversation = Self {
            config,
            step: Step::Gender,
            draft: ProfileDraft::default(),
            snapshot: None,
            editing_single: false,
            week_number: 1,
            results: None,
            ring: OptionRing::default(),
        };

        let mut messages = vec![ConversationMessage::bot(translator.translate("chat.greeting"))];

        match snapshot {
            Some(snap) if snap.is_fillable() => {
                conversation.draft = ProfileDraft {
                    gender: snap.gender,
                    age: snap.age_years(),
                    height_cm: snap.height_cm,
                    weight_kg: snap.weight_kg,
                    activity: None,
                    goal: None,
                    target_weight_kg: snap.target_weight_kg,
                };
                conversation.snapshot = Some(snap);
                conversation.step = Step::ConfirmProfile;
                messages.push(confirm_profile_prompt(&conversation.draft, translator));
                tracing::info!("conversation started from profile snapshot");
            }
            other => {
                conversation.snapshot = other;
                messages.push(gender_prompt(translator));
                tracing::info!("conversation started from scratch");
            }
        }

        (conversation, messages)
    }

    /// Auto-update entry for the weekly reminder: no questions, reuse
    /// the last known profile, bump the week and regenerate the dry
    /// plan directly.
    pub fn start_auto_update(
        config: Config,
        mut draft: ProfileDraft,
        week_number: u32,
        translator: &dyn Translator,
    ) -> (Self, Vec<ConversationMessage>, Vec<Effect>) {
        draft.goal = Some(Goal::Dry);

        let mut conversation = Self {
            config,
            step: Step::Done,
            draft,
            snapshot: None,
            editing_single: false,
            week_number: week_number.max(1),
            results: None,
            ring: OptionRing::default(),
        };

        let mut messages = vec![ConversationMessage::bot(translator.translate_with(
            "chat.auto_update_intro",
            &[("week", conversation.week_number.to_string())],
        ))];
        let mut effects = Vec::new();
        messages.extend(conversation.generate_results(translator, &mut effects));
        conversation.seed_ring(translator);

        tracing::info!(week = conversation.week_number, "auto-update regeneration");
        (conversation, messages, effects)
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    pub fn week_number(&self) -> u32 {
        self.week_number
    }

    /// KBJU goals of the last generated plan, for the apply action
    pub fn current_goals(&self) -> Option<KbjuGoals> {
        self.results.as_ref().map(|r| r.goals)
    }

    /// Process one user answer. `value` is the machine-readable answer
    /// (an option value or the raw text), `display_text` what the user
    /// saw themselves send.
    pub fn process_answer(
        &mut self,
        value: &str,
        display_text: &str,
        translator: &dyn Translator,
    ) -> Turn {
        let user_message = ConversationMessage::user(display_text);

        // Moderation gates every user-authored string. A hit emits the
        // fixed warning and leaves the state untouched.
        if moderation::contains_banned_content(value) {
            return Turn {
                user_message,
                replies: vec![ConversationMessage::bot(
                    translator.translate("chat.moderation_warning"),
                )],
                delay: ReplyDelay::Short,
                effects: Vec::new(),
            };
        }

        let mut effects = Vec::new();
        let (replies, delay) = match self.step {
            Step::ConfirmProfile => self.on_confirm_profile(value, translator),
            Step::SelectField => self.on_select_field(value, translator),
            Step::Gender => self.on_gender(value, translator),
            Step::Age => self.on_age(value, translator),
            Step::Height => self.on_height(value, translator),
            Step::Weight => self.on_weight(value, translator),
            Step::Activity => self.on_activity(value, translator),
            Step::Goal => self.on_goal(value, translator),
            Step::TargetWeight => self.on_target_weight(value, translator, &mut effects),
            Step::SaveProfile => self.on_save_profile(value, translator, &mut effects),
            Step::Done => self.on_free_chat(value, translator),
        };

        Turn {
            user_message,
            replies,
            delay,
            effects,
        }
    }

    // ------------------------------------------------------------------
    // Step handlers
    // ------------------------------------------------------------------

    fn on_confirm_profile(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        match value {
            "confirm" => {
                self.step = Step::Activity;
                (vec![activity_prompt(translator)], ReplyDelay::Short)
            }
            "change" => {
                self.step = Step::SelectField;
                (vec![select_field_prompt(translator)], ReplyDelay::Short)
            }
            _ => (
                vec![confirm_profile_prompt(&self.draft, translator)],
                ReplyDelay::Short,
            ),
        }
    }

    fn on_select_field(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        let (field, prompt) = match value {
            "gender" => (Some(EditField::Gender), gender_prompt(translator)),
            "age" => (Some(EditField::Age), ask(translator, "chat.ask_age")),
            "height" => (Some(EditField::Height), ask(translator, "chat.ask_height")),
            "weight" => (Some(EditField::Weight), ask(translator, "chat.ask_weight")),
            "all" => {
                // Full reset walks the entire chain again
                self.draft.reset();
                self.editing_single = false;
                self.step = Step::Gender;
                return (vec![gender_prompt(translator)], ReplyDelay::Short);
            }
            _ => {
                return (vec![select_field_prompt(translator)], ReplyDelay::Short);
            }
        };

        if let Some(field) = field {
            self.editing_single = true;
            self.step = match field {
                EditField::Gender => Step::Gender,
                EditField::Age => Step::Age,
                EditField::Height => Step::Height,
                EditField::Weight => Step::Weight,
            };
        }
        (vec![prompt], ReplyDelay::Short)
    }

    fn on_gender(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        let gender = match value {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => return (vec![gender_prompt(translator)], ReplyDelay::Short),
        };
        self.draft.gender = Some(gender);
        self.advance_after(Step::Age, ask(translator, "chat.ask_age"), translator)
    }

    fn on_age(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        match guard_age(value, translator) {
            StepOutcome::Retry(message) => {
                (vec![ConversationMessage::bot(message)], ReplyDelay::Short)
            }
            StepOutcome::Advance(_) => {
                // Guard already validated the parse
                self.draft.age = value.trim().parse().ok();
                self.advance_after(Step::Height, ask(translator, "chat.ask_height"), translator)
            }
        }
    }

    fn on_height(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        match guard_height(value, translator) {
            StepOutcome::Retry(message) => {
                (vec![ConversationMessage::bot(message)], ReplyDelay::Short)
            }
            StepOutcome::Advance(_) => {
                self.draft.height_cm = parse_number(value);
                self.advance_after(Step::Weight, ask(translator, "chat.ask_weight"), translator)
            }
        }
    }

    fn on_weight(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        match guard_weight(value, translator) {
            StepOutcome::Retry(message) => {
                (vec![ConversationMessage::bot(message)], ReplyDelay::Short)
            }
            StepOutcome::Advance(_) => {
                self.draft.weight_kg = parse_number(value);
                self.advance_after(Step::Activity, activity_prompt(translator), translator)
            }
        }
    }

    fn on_activity(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        let level = value
            .parse::<usize>()
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| ActivityLevel::ALL.get(i).copied());

        match level {
            Some(level) => {
                self.draft.activity = Some(level);
                self.step = Step::Goal;
                (vec![goal_prompt(translator)], ReplyDelay::Short)
            }
            None => (vec![activity_prompt(translator)], ReplyDelay::Short),
        }
    }

    fn on_goal(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        let goal = match value {
            "loss" => Goal::Loss,
            "gain" => Goal::Gain,
            "dry" => Goal::Dry,
            _ => return (vec![goal_prompt(translator)], ReplyDelay::Short),
        };
        self.draft.goal = Some(goal);
        self.step = Step::TargetWeight;
        (
            vec![ConversationMessage::bot_with_options(
                translator.translate("chat.ask_target_weight"),
                vec![MessageOption {
                    value: "skip".into(),
                    label: translator.translate("chat.option_skip"),
                }],
            )],
            ReplyDelay::Short,
        )
    }

    fn on_target_weight(
        &mut self,
        value: &str,
        translator: &dyn Translator,
        effects: &mut Vec<Effect>,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        if value != "skip" {
            let height = self.draft.height_cm.unwrap_or(0.0);
            match guard_target_weight(value, height, translator) {
                StepOutcome::Retry(message) => {
                    return (vec![ConversationMessage::bot(message)], ReplyDelay::Short);
                }
                StepOutcome::Advance(_) => {
                    self.draft.target_weight_kg = parse_number(value);
                }
            }
        }

        if self.differs_from_snapshot() {
            self.step = Step::SaveProfile;
            (
                vec![ConversationMessage::bot_with_options(
                    translator.translate("chat.ask_save_profile"),
                    vec![
                        MessageOption {
                            value: "save".into(),
                            label: translator.translate("chat.option_save"),
                        },
                        MessageOption {
                            value: "skip".into(),
                            label: translator.translate("chat.option_skip"),
                        },
                    ],
                )],
                ReplyDelay::Short,
            )
        } else {
            // Nothing changed against the stored profile: no save
            // question, straight to generation.
            self.finish_with_results(translator, effects)
        }
    }

    fn on_save_profile(
        &mut self,
        value: &str,
        translator: &dyn Translator,
        effects: &mut Vec<Effect>,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        let mut replies = Vec::new();

        if value == "save" {
            effects.push(Effect::SaveProfile {
                update: ProfileUpdate {
                    gender: self.draft.gender,
                    height_cm: self.draft.height_cm,
                    weight_kg: self.draft.weight_kg,
                    target_weight_kg: self.draft.target_weight_kg,
                },
                weight_changed: self.weight_changed(),
            });
            replies.push(ConversationMessage::bot(
                translator.translate("chat.profile_saving"),
            ));
        }

        let (mut results, delay) = self.finish_with_results(translator, effects);
        replies.append(&mut results);
        (replies, delay)
    }

    fn on_free_chat(
        &mut self,
        value: &str,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        // Priority: correction > topic answer > fallback. Moderation
        // already ran in process_answer.
        let exclusions = correction::detect_exclusions(value);
        if !exclusions.is_empty() {
            return self.apply_exclusions(&exclusions, translator);
        }

        if correction::has_correction_intent(value) {
            // The user wants a change but named no food group we know
            return (
                vec![ConversationMessage::bot(
                    translator.translate("chat.correction_clarify"),
                )],
                ReplyDelay::Short,
            );
        }

        match topics::match_topic(value) {
            Some(topics::CORRECTION_ANSWER_KEY) => (
                vec![ConversationMessage::bot(
                    translator.translate("chat.correction_clarify"),
                )],
                ReplyDelay::Short,
            ),
            Some(answer_key) => {
                self.ring.push(MessageOption {
                    value: answer_key.to_string(),
                    label: translator.translate(answer_key),
                });
                (
                    vec![ConversationMessage::bot(translator.translate(answer_key))],
                    ReplyDelay::Short,
                )
            }
            None => (
                vec![ConversationMessage::bot_with_options(
                    translator.translate(topics::FALLBACK_ANSWER_KEY),
                    self.ring.as_options(),
                )],
                ReplyDelay::Short,
            ),
        }
    }

    fn apply_exclusions(
        &mut self,
        exclusions: &BTreeSet<ExclusionCategory>,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        let Some(results) = self.results.as_mut() else {
            return (
                vec![ConversationMessage::bot(
                    translator.translate("chat.correction_clarify"),
                )],
                ReplyDelay::Short,
            );
        };

        let meal_catalog = catalog::get_default_catalog();
        let replaced =
            correction::apply_corrections(&mut results.plan, exclusions, meal_catalog, translator);

        if replaced == 0 {
            return (
                vec![ConversationMessage::bot(
                    translator.translate("chat.correction_nothing_to_change"),
                )],
                ReplyDelay::Short,
            );
        }

        let goals = results.goals;
        let corrected_plan = results.plan.clone();
        (
            vec![ConversationMessage {
                is_user: false,
                text: Some(translator.translate("chat.plan_corrected")),
                meal_plan: Some(corrected_plan),
                apply_kbju: Some(goals),
                ..ConversationMessage::default()
            }],
            ReplyDelay::Analysis,
        )
    }

    // ------------------------------------------------------------------
    // Flow helpers
    // ------------------------------------------------------------------

    /// Advance down the chain, or back to Activity when a single-field
    /// edit just finished.
    fn advance_after(
        &mut self,
        next: Step,
        next_prompt: ConversationMessage,
        translator: &dyn Translator,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        if self.editing_single {
            self.editing_single = false;
            self.step = Step::Activity;
            (vec![activity_prompt(translator)], ReplyDelay::Short)
        } else {
            self.step = next;
            (vec![next_prompt], ReplyDelay::Short)
        }
    }

    fn finish_with_results(
        &mut self,
        translator: &dyn Translator,
        effects: &mut Vec<Effect>,
    ) -> (Vec<ConversationMessage>, ReplyDelay) {
        let messages = self.generate_results(translator, effects);
        self.seed_ring(translator);
        self.step = Step::Done;
        (messages, ReplyDelay::Analysis)
    }

    /// Compute targets, the weekly plan and the analysis report from
    /// the collected draft.
    fn generate_results(
        &mut self,
        translator: &dyn Translator,
        effects: &mut Vec<Effect>,
    ) -> Vec<ConversationMessage> {
        let draft = &self.draft;
        let (Some(gender), Some(age), Some(height), Some(weight), Some(activity), Some(goal)) = (
            draft.gender,
            draft.age,
            draft.height_cm,
            draft.weight_kg,
            draft.activity,
            draft.goal,
        ) else {
            tracing::warn!("generate_results called with an incomplete draft");
            return vec![ConversationMessage::bot(
                translator.translate("chat.incomplete_profile"),
            )];
        };

        let week = self.week_number;
        let bmr = energy::bmr(weight, height, age, gender);
        let maintenance = energy::maintenance_kcal(bmr, activity.coefficient());
        let target = energy::goal_kcal(maintenance, goal, week, &self.config);
        let ratios = energy::macro_ratios(goal, week, &self.config);
        let macros = energy::macro_targets(target.kcal, ratios);

        let meal_catalog = catalog::get_default_catalog();
        let week_plan = plan::generate_week(goal, week, target.kcal, meal_catalog, &self.config);

        let goals = KbjuGoals {
            calories: target.kcal,
            protein: macros.protein_g,
            fats: macros.fat_g,
            carbs: macros.carb_g,
        };

        let analysis = build_analysis(
            translator,
            weight,
            height,
            maintenance,
            target,
            macros,
            goal,
            week,
        );

        self.results = Some(GeneratedResults {
            plan: week_plan.clone(),
            goals,
        });

        if goal == Goal::Dry {
            effects.push(Effect::DryPlanGenerated { week });
        }

        tracing::info!(?goal, week, kcal = target.kcal, "results generated");

        vec![
            ConversationMessage {
                is_user: false,
                text: Some(translator.translate("chat.results_intro")),
                analysis: Some(analysis),
                ..ConversationMessage::default()
            },
            ConversationMessage {
                is_user: false,
                text: Some(translator.translate("chat.plan_intro")),
                meal_plan: Some(week_plan),
                apply_kbju: Some(goals),
                ..ConversationMessage::default()
            },
        ]
    }

    fn seed_ring(&mut self, translator: &dyn Translator) {
        for key in ["chat.answer.water", "chat.answer.protein", "chat.answer.training"] {
            self.ring.push(MessageOption {
                value: key.to_string(),
                label: translator.translate(key),
            });
        }
    }

    /// Whether the collected data differs from the external snapshot
    /// (a newly entered target weight counts as a difference).
    fn differs_from_snapshot(&self) -> bool {
        let Some(snap) = &self.snapshot else {
            return true;
        };

        self.draft.gender != snap.gender
            || self.draft.age != snap.age_years()
            || !approx_eq(self.draft.height_cm, snap.height_cm)
            || !approx_eq(self.draft.weight_kg, snap.weight_kg)
            || (self.draft.target_weight_kg.is_some()
                && !approx_eq(self.draft.target_weight_kg, snap.target_weight_kg))
    }

    fn weight_changed(&self) -> bool {
        match (self.draft.weight_kg, self.snapshot.as_ref().and_then(|s| s.weight_kg)) {
            (Some(new), Some(old)) => (new - old).abs() >= 0.1,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

fn approx_eq(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() < 0.1,
        (None, None) => true,
        _ => false,
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse().ok()
}

// ----------------------------------------------------------------------
// Guards
// ----------------------------------------------------------------------

/// Age guard: integer in [14, 100]
pub fn guard_age(value: &str, translator: &dyn Translator) -> StepOutcome {
    match value.trim().parse::<u32>() {
        Ok(age) if (AGE_RANGE.0..=AGE_RANGE.1).contains(&age) => StepOutcome::Advance(Step::Height),
        _ => StepOutcome::Retry(translator.translate_with(
            "chat.invalid_age",
            &[
                ("min", AGE_RANGE.0.to_string()),
                ("max", AGE_RANGE.1.to_string()),
            ],
        )),
    }
}

/// Height guard: number in [100, 250] cm
pub fn guard_height(value: &str, translator: &dyn Translator) -> StepOutcome {
    match parse_number(value) {
        Some(h) if (HEIGHT_RANGE.0..=HEIGHT_RANGE.1).contains(&h) => {
            StepOutcome::Advance(Step::Weight)
        }
        _ => StepOutcome::Retry(translator.translate_with(
            "chat.invalid_height",
            &[
                ("min", format!("{:.0}", HEIGHT_RANGE.0)),
                ("max", format!("{:.0}", HEIGHT_RANGE.1)),
            ],
        )),
    }
}

/// Weight guard: number in [30, 300] kg
pub fn guard_weight(value: &str, translator: &dyn Translator) -> StepOutcome {
    match parse_number(value) {
        Some(w) if (WEIGHT_RANGE.0..=WEIGHT_RANGE.1).contains(&w) => {
            StepOutcome::Advance(Step::Activity)
        }
        _ => StepOutcome::Retry(translator.translate_with(
            "chat.invalid_weight",
            &[
                ("min", format!("{:.0}", WEIGHT_RANGE.0)),
                ("max", format!("{:.0}", WEIGHT_RANGE.1)),
            ],
        )),
    }
}

/// Target-weight guard: [30, 300] kg and inside the normal BMI weight
/// range for the given height; the rejection quotes the valid range.
pub fn guard_target_weight(value: &str, height_cm: f64, translator: &dyn Translator) -> StepOutcome {
    let Some(target) = parse_number(value) else {
        return retry_target(height_cm, translator);
    };
    if !(WEIGHT_RANGE.0..=WEIGHT_RANGE.1).contains(&target) {
        return retry_target(height_cm, translator);
    }

    let (low, high) = energy::normal_weight_range(height_cm);
    if target < low || target > high {
        return retry_target(height_cm, translator);
    }

    StepOutcome::Advance(Step::SaveProfile)
}

fn retry_target(height_cm: f64, translator: &dyn Translator) -> StepOutcome {
    let (low, high) = energy::normal_weight_range(height_cm);
    StepOutcome::Retry(translator.translate_with(
        "chat.invalid_target_weight",
        &[
            ("min", format!("{:.1}", low)),
            ("max", format!("{:.1}", high)),
        ],
    ))
}

// ----------------------------------------------------------------------
// Prompts
// ----------------------------------------------------------------------

fn ask(translator: &dyn Translator, key: &str) -> ConversationMessage {
    ConversationMessage::bot(translator.translate(key))
}

fn gender_prompt(translator: &dyn Translator) -> ConversationMessage {
    ConversationMessage::bot_with_options(
        translator.translate("chat.ask_gender"),
        vec![
            MessageOption {
                value: "male".into(),
                label: translator.translate("chat.option_male"),
            },
            MessageOption {
                value: "female".into(),
                label: translator.translate("chat.option_female"),
            },
        ],
    )
}

fn activity_prompt(translator: &dyn Translator) -> ConversationMessage {
    let options = ActivityLevel::ALL
        .iter()
        .enumerate()
        .map(|(i, level)| MessageOption {
            value: (i + 1).to_string(),
            label: translator.translate(level.name_key()),
        })
        .collect();
    ConversationMessage::bot_with_options(translator.translate("chat.ask_activity"), options)
}

fn goal_prompt(translator: &dyn Translator) -> ConversationMessage {
    ConversationMessage::bot_with_options(
        translator.translate("chat.ask_goal"),
        vec![
            MessageOption {
                value: "loss".into(),
                label: translator.translate("goal.loss"),
            },
            MessageOption {
                value: "gain".into(),
                label: translator.translate("goal.gain"),
            },
            MessageOption {
                value: "dry".into(),
                label: translator.translate("goal.dry"),
            },
        ],
    )
}

fn select_field_prompt(translator: &dyn Translator) -> ConversationMessage {
    let options = [
        ("gender", "chat.field_gender"),
        ("age", "chat.field_age"),
        ("height", "chat.field_height"),
        ("weight", "chat.field_weight"),
        ("all", "chat.field_all"),
    ]
    .into_iter()
    .map(|(value, key)| MessageOption {
        value: value.into(),
        label: translator.translate(key),
    })
    .collect();
    ConversationMessage::bot_with_options(translator.translate("chat.ask_select_field"), options)
}

fn confirm_profile_prompt(draft: &ProfileDraft, translator: &dyn Translator) -> ConversationMessage {
    let params = [
        (
            "age",
            draft.age.map(|a| a.to_string()).unwrap_or_default(),
        ),
        (
            "height",
            draft
                .height_cm
                .map(|h| format!("{:.0}", h))
                .unwrap_or_default(),
        ),
        (
            "weight",
            draft
                .weight_kg
                .map(|w| format!("{:.1}", w))
                .unwrap_or_default(),
        ),
    ];
    ConversationMessage::bot_with_options(
        translator.translate_with("chat.confirm_profile", &params),
        vec![
            MessageOption {
                value: "confirm".into(),
                label: translator.translate("chat.option_confirm"),
            },
            MessageOption {
                value: "change".into(),
                label: translator.translate("chat.option_change"),
            },
        ],
    )
}

// ----------------------------------------------------------------------
// Analysis report
// ----------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn build_analysis(
    translator: &dyn Translator,
    weight: f64,
    height: f64,
    maintenance: i32,
    target: EnergyTarget,
    macros: crate::MacroTargets,
    goal: Goal,
    week: u32,
) -> Vec<AnalysisSection> {
    let bmi = energy::bmi(weight, height);
    let category = energy::bmi_category(bmi);

    let status = AnalysisSection {
        icon: "📊".into(),
        title: translator.translate("analysis.status.title"),
        lines: vec![
            translator.translate_with(
                "analysis.status.bmi",
                &[
                    ("bmi", format!("{:.1}", bmi)),
                    ("category", translator.translate(category.name_key())),
                ],
            ),
            translator.translate_with(
                "analysis.status.maintenance",
                &[("kcal", maintenance.to_string())],
            ),
        ],
    };

    let calories = AnalysisSection {
        icon: "🔥".into(),
        title: translator.translate("analysis.calories.title"),
        lines: vec![
            translator.translate_with("analysis.calories.goal", &[("kcal", target.kcal.to_string())]),
            translator.translate_with(
                "analysis.calories.macros",
                &[
                    ("protein", macros.protein_g.to_string()),
                    ("fat", macros.fat_g.to_string()),
                    ("carbs", macros.carb_g.to_string()),
                ],
            ),
        ],
    };

    let mut risk_lines = Vec::new();
    if target.was_floored() {
        risk_lines.push(translator.translate_with(
            "analysis.risks.calorie_floor",
            &[("kcal", target.kcal.to_string())],
        ));
    }
    match category {
        BmiCategory::Normal => {}
        BmiCategory::SevereThinness | BmiCategory::ModerateThinness | BmiCategory::MildThinness => {
            risk_lines.push(translator.translate("analysis.risks.underweight"));
        }
        _ => risk_lines.push(translator.translate("analysis.risks.overweight")),
    }
    if goal == Goal::Dry && week > 8 {
        risk_lines.push(translator.translate("analysis.risks.long_dry"));
    }
    if risk_lines.is_empty() {
        risk_lines.push(translator.translate("analysis.risks.none"));
    }

    let risks = AnalysisSection {
        icon: "⚠️".into(),
        title: translator.translate("analysis.risks.title"),
        lines: risk_lines,
    };

    let recommendations = AnalysisSection {
        icon: "✅".into(),
        title: translator.translate("analysis.recommendations.title"),
        lines: vec![
            translator.translate("analysis.recommendations.water"),
            translator.translate("analysis.recommendations.protein_spread"),
            translator.translate("analysis.recommendations.weekly_weighin"),
        ],
    };

    vec![status, calories, risks, recommendations]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::KeyTranslator;
    use chrono::NaiveDate;

    fn fresh() -> (Conversation, Vec<ConversationMessage>) {
        Conversation::start(Config::default(), None, &KeyTranslator)
    }

    fn snapshot() -> ProfileSnapshot {
        ProfileSnapshot {
            gender: Some(Gender::Male),
            birthdate: NaiveDate::from_ymd_opt(1994, 6, 1),
            height_cm: Some(175.0),
            weight_kg: Some(70.0),
            target_weight_kg: None,
        }
    }

    fn answer(conversation: &mut Conversation, value: &str) -> Turn {
        conversation.process_answer(value, value, &KeyTranslator)
    }

    /// Drive the questionnaire to the save prompt with fixed answers
    fn drive_to_save(conversation: &mut Conversation, goal: &str) {
        for value in ["male", "30", "175", "70", "4", goal, "skip"] {
            answer(conversation, value);
        }
    }

    #[test]
    fn test_start_from_scratch_opens_with_gender() {
        let (conversation, messages) = fresh();
        assert_eq!(conversation.step(), Step::Gender);
        assert_eq!(messages.len(), 2);
        let options = messages[1].options.as_ref().unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].value, "male");
    }

    #[test]
    fn test_start_from_snapshot_asks_for_confirmation() {
        let (conversation, messages) =
            Conversation::start(Config::default(), Some(snapshot()), &KeyTranslator);
        assert_eq!(conversation.step(), Step::ConfirmProfile);
        assert_eq!(conversation.draft().gender, Some(Gender::Male));
        assert_eq!(conversation.draft().height_cm, Some(175.0));
        let options = messages[1].options.as_ref().unwrap();
        assert_eq!(options[0].value, "confirm");
        assert_eq!(options[1].value, "change");
    }

    #[test]
    fn test_confirm_skips_straight_to_activity() {
        let (mut conversation, _) =
            Conversation::start(Config::default(), Some(snapshot()), &KeyTranslator);
        answer(&mut conversation, "confirm");
        assert_eq!(conversation.step(), Step::Activity);
    }

    #[test]
    fn test_invalid_age_retries_in_place() {
        let (mut conversation, _) = fresh();
        answer(&mut conversation, "male");
        assert_eq!(conversation.step(), Step::Age);

        let turn = answer(&mut conversation, "abc");
        assert_eq!(conversation.step(), Step::Age);
        assert_eq!(turn.replies[0].text.as_deref(), Some("chat.invalid_age"));

        answer(&mut conversation, "250");
        assert_eq!(conversation.step(), Step::Age);

        answer(&mut conversation, "30");
        assert_eq!(conversation.step(), Step::Height);
        assert_eq!(conversation.draft().age, Some(30));
    }

    #[test]
    fn test_height_and_weight_bounds() {
        let (mut conversation, _) = fresh();
        answer(&mut conversation, "male");
        answer(&mut conversation, "30");

        answer(&mut conversation, "90");
        assert_eq!(conversation.step(), Step::Height);
        answer(&mut conversation, "175");
        assert_eq!(conversation.step(), Step::Weight);

        answer(&mut conversation, "310");
        assert_eq!(conversation.step(), Step::Weight);
        answer(&mut conversation, "70,5");
        assert_eq!(conversation.step(), Step::Activity);
        assert_eq!(conversation.draft().weight_kg, Some(70.5));
    }

    #[test]
    fn test_target_weight_outside_normal_bmi_range_is_rejected() {
        let (mut conversation, _) = fresh();
        for value in ["male", "30", "175", "70", "4", "loss"] {
            answer(&mut conversation, value);
        }
        assert_eq!(conversation.step(), Step::TargetWeight);

        // Normal range at 175 cm is roughly 53.9..76.3 kg
        answer(&mut conversation, "45");
        assert_eq!(conversation.step(), Step::TargetWeight);
        answer(&mut conversation, "90");
        assert_eq!(conversation.step(), Step::TargetWeight);

        answer(&mut conversation, "68");
        assert_eq!(conversation.step(), Step::SaveProfile);
        assert_eq!(conversation.draft().target_weight_kg, Some(68.0));
    }

    #[test]
    fn test_full_flow_generates_plan_and_goals() {
        let (mut conversation, _) = fresh();
        drive_to_save(&mut conversation, "loss");
        assert_eq!(conversation.step(), Step::SaveProfile);

        let turn = answer(&mut conversation, "skip");
        assert_eq!(conversation.step(), Step::Done);
        assert_eq!(turn.delay, ReplyDelay::Analysis);
        assert_eq!(turn.replies.len(), 2);

        let analysis = turn.replies[0].analysis.as_ref().unwrap();
        assert_eq!(analysis.len(), 4);

        let week_plan = turn.replies[1].meal_plan.as_ref().unwrap();
        assert_eq!(week_plan.len(), 7);
        assert!(week_plan.iter().all(|d| d.meals.len() == 4));

        let goals = turn.replies[1].apply_kbju.unwrap();
        assert_eq!(goals.calories, conversation.current_goals().unwrap().calories);
        assert!(goals.calories > 1200);
    }

    #[test]
    fn test_save_answer_emits_profile_effect() {
        let (mut conversation, _) = fresh();
        drive_to_save(&mut conversation, "loss");

        let turn = answer(&mut conversation, "save");
        let save = turn
            .effects
            .iter()
            .find_map(|e| match e {
                Effect::SaveProfile {
                    update,
                    weight_changed,
                } => Some((update.clone(), *weight_changed)),
                _ => None,
            })
            .expect("save effect emitted");
        assert_eq!(save.0.weight_kg, Some(70.0));
        assert!(save.1, "no snapshot weight means the weight is new");
        assert_eq!(turn.replies[0].text.as_deref(), Some("chat.profile_saving"));

        let expected = Effect::SaveProfile {
            update: ProfileUpdate {
                gender: Some(Gender::Male),
                height_cm: Some(175.0),
                weight_kg: Some(70.0),
                target_weight_kg: None,
            },
            weight_changed: true,
        };
        assert!(turn.effects.contains(&expected));
    }

    #[test]
    fn test_unchanged_snapshot_skips_the_save_question() {
        let (mut conversation, _) =
            Conversation::start(Config::default(), Some(snapshot()), &KeyTranslator);
        answer(&mut conversation, "confirm");
        answer(&mut conversation, "4");
        answer(&mut conversation, "loss");

        let turn = answer(&mut conversation, "skip");
        assert_eq!(conversation.step(), Step::Done, "no save prompt when nothing changed");
        assert!(turn.effects.iter().all(|e| !matches!(e, Effect::SaveProfile { .. })));
    }

    #[test]
    fn test_single_field_edit_returns_to_activity() {
        let (mut conversation, _) =
            Conversation::start(Config::default(), Some(snapshot()), &KeyTranslator);
        answer(&mut conversation, "change");
        assert_eq!(conversation.step(), Step::SelectField);

        answer(&mut conversation, "weight");
        assert_eq!(conversation.step(), Step::Weight);

        answer(&mut conversation, "82");
        assert_eq!(conversation.step(), Step::Activity);
        assert_eq!(conversation.draft().weight_kg, Some(82.0));
        // The rest of the snapshot survived the single-field edit
        assert_eq!(conversation.draft().gender, Some(Gender::Male));
    }

    #[test]
    fn test_edit_all_resets_the_draft() {
        let (mut conversation, _) =
            Conversation::start(Config::default(), Some(snapshot()), &KeyTranslator);
        answer(&mut conversation, "change");
        answer(&mut conversation, "all");
        assert_eq!(conversation.step(), Step::Gender);
        assert_eq!(conversation.draft(), &ProfileDraft::default());
    }

    #[test]
    fn test_moderation_blocks_without_state_change() {
        let (mut conversation, _) = fresh();
        answer(&mut conversation, "male");
        assert_eq!(conversation.step(), Step::Age);

        let turn = answer(&mut conversation, "де купити наркотики");
        assert_eq!(conversation.step(), Step::Age, "state untouched");
        assert_eq!(
            turn.replies[0].text.as_deref(),
            Some("chat.moderation_warning")
        );
        assert!(turn.effects.is_empty());
    }

    #[test]
    fn test_dry_goal_emits_generation_effect() {
        let (mut conversation, _) = fresh();
        drive_to_save(&mut conversation, "dry");
        let turn = answer(&mut conversation, "skip");
        assert!(turn
            .effects
            .contains(&Effect::DryPlanGenerated { week: 1 }));
    }

    #[test]
    fn test_free_chat_topic_answer() {
        let (mut conversation, _) = fresh();
        drive_to_save(&mut conversation, "loss");
        answer(&mut conversation, "skip");

        let turn = answer(&mut conversation, "скільки води пити?");
        assert_eq!(turn.replies[0].text.as_deref(), Some("chat.answer.water"));
        assert_eq!(conversation.step(), Step::Done);
    }

    #[test]
    fn test_free_chat_fallback_carries_ring_options() {
        let (mut conversation, _) = fresh();
        drive_to_save(&mut conversation, "loss");
        answer(&mut conversation, "skip");

        let turn = answer(&mut conversation, "розкажи анекдот");
        assert_eq!(
            turn.replies[0].text.as_deref(),
            Some(topics::FALLBACK_ANSWER_KEY)
        );
        let options = turn.replies[0].options.as_ref().unwrap();
        assert_eq!(options.len(), 3, "ring seeds three suggestions");
    }

    #[test]
    fn test_free_chat_exclusion_corrects_the_plan() {
        let (mut conversation, _) = fresh();
        drive_to_save(&mut conversation, "loss");
        answer(&mut conversation, "skip");

        let turn = answer(&mut conversation, "я не їм рибу");
        assert_eq!(turn.delay, ReplyDelay::Analysis);
        let corrected = turn.replies[0].meal_plan.as_ref().expect("corrected plan");
        for day in corrected {
            for meal in &day.meals {
                assert!(!meal.name_key.contains("fish"), "{}", meal.name_key);
            }
        }
        assert!(turn.replies[0].apply_kbju.is_some());
    }

    #[test]
    fn test_free_chat_intent_without_category_asks_for_clarification() {
        let (mut conversation, _) = fresh();
        drive_to_save(&mut conversation, "loss");
        answer(&mut conversation, "skip");

        let turn = answer(&mut conversation, "прибери оце зелене");
        assert_eq!(
            turn.replies[0].text.as_deref(),
            Some("chat.correction_clarify")
        );
    }

    #[test]
    fn test_auto_update_regenerates_dry_plan() {
        let draft = ProfileDraft {
            gender: Some(Gender::Female),
            age: Some(28),
            height_cm: Some(165.0),
            weight_kg: Some(60.0),
            activity: Some(ActivityLevel::Light),
            goal: Some(Goal::Dry),
            target_weight_kg: None,
        };
        let (conversation, messages, effects) =
            Conversation::start_auto_update(Config::default(), draft, 3, &KeyTranslator);

        assert_eq!(conversation.step(), Step::Done);
        assert_eq!(conversation.week_number(), 3);
        assert!(effects.contains(&Effect::DryPlanGenerated { week: 3 }));
        assert!(messages.iter().any(|m| m.meal_plan.is_some()));
    }

    #[test]
    fn test_option_ring_keeps_last_three_oldest_first() {
        let mut ring = OptionRing::default();
        for (value, label) in [("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")] {
            ring.push(MessageOption {
                value: value.into(),
                label: label.into(),
            });
        }
        let options = ring.as_options();
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["b", "c", "d"]);
    }
}
