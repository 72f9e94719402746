use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dryplan_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dryplan")]
#[command(about = "Conversational nutrition planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive planning chat (default)
    Chat {
        /// Write the transcript to this JSON file on save
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// One-shot weekly plan printout
    Plan {
        /// male or female
        #[arg(long)]
        gender: String,

        /// Age in years
        #[arg(long)]
        age: u32,

        /// Height in cm
        #[arg(long)]
        height: f64,

        /// Weight in kg
        #[arg(long)]
        weight: f64,

        /// Activity level 1-7 (sedentary to extreme)
        #[arg(long, default_value_t = 4)]
        activity: usize,

        /// loss, gain or dry
        #[arg(long)]
        goal: String,

        /// Program week (dry goal tightens week over week)
        #[arg(long, default_value_t = 1)]
        week: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dryplan_core::logging::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Plan {
            gender,
            age,
            height,
            weight,
            activity,
            goal,
            week,
        }) => cmd_plan(&config, &gender, age, height, weight, activity, &goal, week),
        Some(Commands::Chat { transcript }) => cmd_chat(config, transcript).await,
        None => cmd_chat(config, None).await,
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_plan(
    config: &Config,
    gender: &str,
    age: u32,
    height: f64,
    weight: f64,
    activity: usize,
    goal: &str,
    week: u32,
) -> Result<()> {
    let translator = EnTranslator;

    let gender = match gender {
        "male" => Gender::Male,
        "female" => Gender::Female,
        other => return Err(Error::Other(format!("unknown gender: {}", other))),
    };
    let goal = match goal {
        "loss" => Goal::Loss,
        "gain" => Goal::Gain,
        "dry" => Goal::Dry,
        other => return Err(Error::Other(format!("unknown goal: {}", other))),
    };
    let activity = activity
        .checked_sub(1)
        .and_then(|i| ActivityLevel::ALL.get(i).copied())
        .ok_or_else(|| Error::Other("activity must be 1-7".into()))?;

    let bmr_kcal = bmr(weight, height, age, gender);
    let maintenance = maintenance_kcal(bmr_kcal, activity.coefficient());
    let target = goal_kcal(maintenance, goal, week, config);
    let ratios = energy::macro_ratios(goal, week, config);
    let macros = energy::macro_targets(target.kcal, ratios);
    let body_mass_index = bmi(weight, height);

    println!("BMR: {:.0} kcal", bmr_kcal);
    println!("Maintenance: {} kcal", maintenance);
    println!(
        "BMI: {:.1} ({})",
        body_mass_index,
        translator.translate(bmi_category(body_mass_index).name_key())
    );
    println!(
        "Daily target: {} kcal ({}g protein / {}g fat / {}g carbs)",
        target.kcal, macros.protein_g, macros.fat_g, macros.carb_g
    );
    if target.was_floored() {
        println!("Note: target raised to the {} kcal safety floor", config.plan.calorie_floor);
    }
    println!();

    let catalog = get_default_catalog();
    catalog.ensure_valid()?;
    let week_plan = generate_week(goal, week, target.kcal, catalog, config);
    print_week(&week_plan, &translator);
    Ok(())
}

fn print_week(week_plan: &[DayPlan], translator: &dyn Translator) {
    for day in week_plan {
        println!("== {} ==", translator.translate(&day.day_key));
        for meal in &day.meals {
            println!(
                "  {:<10} {:<28} {:>4} kcal  P{} F{} C{}",
                translator.translate(meal.slot.name_key()),
                translator.translate(&meal.name_key),
                meal.kcal,
                meal.protein_g,
                meal.fat_g,
                meal.carb_g
            );
        }
        println!(
            "  {:<10} {:<28} {:>4} kcal  P{} F{} C{}",
            "total", "", day.totals.kcal, day.totals.protein_g, day.totals.fat_g, day.totals.carb_g
        );
    }
}

async fn cmd_chat(config: Config, transcript_path: Option<PathBuf>) -> Result<()> {
    let session_config = config.session.clone();
    let store = Arc::new(MemPorts::new(transcript_path));
    let translator = Arc::new(EnTranslator);

    let session = ChatSession::open(
        session_config.clone(),
        config,
        Arc::clone(&store) as Arc<dyn ConversationStore>,
        Arc::clone(&store) as Arc<dyn ProfileStore>,
        Arc::clone(&store) as Arc<dyn GoalsStore>,
        Arc::clone(&store) as Arc<dyn ReminderSchedule>,
        translator,
    )
    .await?;

    let mut printed = 0;
    let mut last_options: Vec<MessageOption> = Vec::new();
    printed = print_new(&session, printed, &mut last_options).await;

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        if line == "apply" {
            if session.apply_goals().await {
                println!("[goals applied]");
            }
            printed = print_new(&session, printed, &mut last_options).await;
            continue;
        }

        // A bare number picks the matching quick-reply option
        let (value, display) = match line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| last_options.get(i))
        {
            Some(option) => (option.value.clone(), option.label.clone()),
            None => (line.clone(), line.clone()),
        };

        session.send(&value, &display).await;

        // Wait out the longest reply delay so the answer is in
        let wait = session_config.analysis_reply_ms + 200;
        tokio::time::sleep(std::time::Duration::from_millis(wait)).await;
        printed = print_new(&session, printed, &mut last_options).await;
    }

    session.shutdown().await;
    Ok(())
}

/// Print transcript entries added since the last call
async fn print_new(
    session: &ChatSession,
    printed: usize,
    last_options: &mut Vec<MessageOption>,
) -> usize {
    let transcript = session.transcript().await;
    for message in &transcript[printed..] {
        if message.is_user {
            continue;
        }
        if let Some(text) = &message.text {
            println!("{}", text);
        }
        if let Some(sections) = &message.analysis {
            for section in sections {
                println!("{} {}", section.icon, section.title);
                for line in &section.lines {
                    println!("   {}", line);
                }
            }
        }
        if let Some(week_plan) = &message.meal_plan {
            print_week(week_plan, &EnTranslator);
            println!("(type 'apply' to set these goals in the tracker)");
        }
        if let Some(options) = &message.options {
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {}", i + 1, option.label);
            }
            *last_options = options.clone();
        }
    }
    transcript.len()
}

// ----------------------------------------------------------------------
// In-memory ports for the demo REPL
// ----------------------------------------------------------------------

struct MemPorts {
    transcript_path: Option<PathBuf>,
    profile: Mutex<Option<ProfileSnapshot>>,
    goals: Mutex<Option<KbjuGoals>>,
}

impl MemPorts {
    fn new(transcript_path: Option<PathBuf>) -> Self {
        Self {
            transcript_path,
            profile: Mutex::new(None),
            goals: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ConversationStore for MemPorts {
    async fn create_conversation(&self, _kind: &str) -> PortResult<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn load_conversation(&self, _id: Uuid) -> PortResult<Vec<ConversationMessage>> {
        Ok(Vec::new())
    }

    async fn save_messages(
        &self,
        _id: Uuid,
        messages: Vec<ConversationMessage>,
        _title: &str,
    ) -> PortResult<()> {
        if let Some(path) = &self.transcript_path {
            let json = serde_json::to_string_pretty(&messages)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            std::fs::write(path, json).map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        Ok(())
    }

    async fn delete_conversation(&self, _id: Uuid) -> PortResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemPorts {
    async fn fetch_profile(&self) -> PortResult<Option<ProfileSnapshot>> {
        Ok(self.profile.lock().map_err(lock_err)?.clone())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> PortResult<bool> {
        let mut profile = self.profile.lock().map_err(lock_err)?;
        let snapshot = profile.get_or_insert_with(ProfileSnapshot::default);
        if update.gender.is_some() {
            snapshot.gender = update.gender;
        }
        if update.height_cm.is_some() {
            snapshot.height_cm = update.height_cm;
        }
        if update.weight_kg.is_some() {
            snapshot.weight_kg = update.weight_kg;
        }
        if update.target_weight_kg.is_some() {
            snapshot.target_weight_kg = update.target_weight_kg;
        }
        Ok(true)
    }

    async fn add_weight(&self, weight_kg: f64, _date: Option<NaiveDate>) -> PortResult<bool> {
        tracing::info!(weight_kg, "weight history entry recorded");
        Ok(true)
    }
}

#[async_trait]
impl GoalsStore for MemPorts {
    async fn update_goals(&self, goals: KbjuGoals) -> PortResult<bool> {
        *self.goals.lock().map_err(lock_err)? = Some(goals);
        Ok(true)
    }
}

#[async_trait]
impl ReminderSchedule for MemPorts {
    async fn is_reminder_due(&self) -> PortResult<bool> {
        Ok(false)
    }

    async fn week_number(&self) -> PortResult<u32> {
        Ok(1)
    }

    async fn mark_updated(&self) -> PortResult<()> {
        Ok(())
    }

    async fn activate(&self) -> PortResult<()> {
        tracing::info!("weekly dry-plan reminders activated");
        Ok(())
    }
}

fn lock_err<T>(_: std::sync::PoisonError<T>) -> PortError {
    PortError::Unexpected("port state lock poisoned".into())
}

// ----------------------------------------------------------------------
// English dictionary
// ----------------------------------------------------------------------

/// English dictionary translator for the demo surface.
///
/// Keys without a template fall back to a humanized last segment
/// ("meal.loss.lunch.baked_fish_salad" prints as "baked fish salad"),
/// which keeps meal and weekday names readable without listing all of
/// them here.
struct EnTranslator;

fn template(key: &str) -> Option<&'static str> {
    let text = match key {
        "chat.title" => "Dry plan",
        "chat.greeting" => "Hi! I'll put together your nutrition plan. A few questions first.",
        "chat.ask_gender" => "Your biological sex?",
        "chat.option_male" => "Male",
        "chat.option_female" => "Female",
        "chat.ask_age" => "How old are you?",
        "chat.invalid_age" => "Please enter an age between {min} and {max}.",
        "chat.ask_height" => "Your height in cm?",
        "chat.invalid_height" => "Please enter a height between {min} and {max} cm.",
        "chat.ask_weight" => "Your weight in kg?",
        "chat.invalid_weight" => "Please enter a weight between {min} and {max} kg.",
        "chat.ask_activity" => "How active are you?",
        "chat.ask_goal" => "What's your goal?",
        "chat.ask_target_weight" => "Target weight in kg? (optional)",
        "chat.invalid_target_weight" => {
            "A healthy target for your height is {min}-{max} kg. Pick a value in that range."
        }
        "chat.option_skip" => "Skip",
        "chat.ask_save_profile" => "Save this data to your profile?",
        "chat.option_save" => "Save",
        "chat.profile_saving" => "Saving your profile...",
        "chat.profile_save_failed" => "Couldn't save your profile, but here is your plan anyway.",
        "chat.confirm_profile" => {
            "I have your profile: {age} y.o., {height} cm, {weight} kg. Use it?"
        }
        "chat.option_confirm" => "Yes, use it",
        "chat.option_change" => "Change something",
        "chat.ask_select_field" => "What would you like to change?",
        "chat.field_gender" => "Sex",
        "chat.field_age" => "Age",
        "chat.field_height" => "Height",
        "chat.field_weight" => "Weight",
        "chat.field_all" => "Everything",
        "chat.results_intro" => "Here's your analysis:",
        "chat.plan_intro" => "And your meal plan for the week:",
        "chat.plan_corrected" => "Done, I've updated the plan:",
        "chat.correction_clarify" => {
            "Tell me which food group to remove: fish, meat, dairy or eggs."
        }
        "chat.correction_nothing_to_change" => "Your current plan already avoids that.",
        "chat.moderation_warning" => "Let's keep it to nutrition and health. Ask me about your plan.",
        "chat.goals_apply_failed" => "Couldn't apply the goals to your tracker, try again later.",
        "chat.incomplete_profile" => "I'm missing some of your data, let's start over.",
        "chat.auto_update_intro" => "Week {week} of your dry program. Tightening the plan:",
        "goal.loss" => "Lose weight",
        "goal.gain" => "Gain muscle",
        "goal.dry" => "Dry (cutting)",
        "activity.sedentary" => "Sedentary",
        "activity.low" => "Low (1-2 workouts/week)",
        "activity.light" => "Light (2-3 workouts/week)",
        "activity.moderate" => "Moderate (3-4 workouts/week)",
        "activity.high" => "High (4-5 workouts/week)",
        "activity.very_high" => "Very high (5-6 workouts/week)",
        "activity.extreme" => "Extreme (daily heavy training)",
        "bmi.severe_thinness" => "severe thinness",
        "bmi.moderate_thinness" => "moderate thinness",
        "bmi.mild_thinness" => "mild thinness",
        "bmi.normal" => "normal",
        "bmi.overweight" => "overweight",
        "bmi.obese_1" => "obesity class I",
        "bmi.obese_2" => "obesity class II",
        "bmi.obese_3" => "obesity class III",
        "analysis.status.title" => "Your status",
        "analysis.status.bmi" => "BMI {bmi} ({category})",
        "analysis.status.maintenance" => "Maintenance: {kcal} kcal/day",
        "analysis.calories.title" => "Calories",
        "analysis.calories.goal" => "Daily target: {kcal} kcal",
        "analysis.calories.macros" => "Macros: {protein}g protein, {fat}g fat, {carbs}g carbs",
        "analysis.risks.title" => "Risks",
        "analysis.risks.none" => "Nothing concerning.",
        "analysis.risks.calorie_floor" => {
            "Target raised to the {kcal} kcal safety floor. Don't go lower."
        }
        "analysis.risks.underweight" => "You're under the normal weight range. Be careful with deficits.",
        "analysis.risks.overweight" => "You're above the normal weight range. Steady pace beats crash dieting.",
        "analysis.risks.long_dry" => "You've been cutting for over 8 weeks. Consider a maintenance break.",
        "analysis.recommendations.title" => "Recommendations",
        "analysis.recommendations.water" => "Drink 30-40 ml of water per kg of body weight.",
        "analysis.recommendations.protein_spread" => "Spread protein across all four meals.",
        "analysis.recommendations.weekly_weighin" => "Weigh in once a week, same day, same time.",
        "chat.answer.water" => "Aim for 30-40 ml per kg of body weight daily, more on training days.",
        "chat.answer.protein" => "1.6-2.2 g per kg of body weight works for most goals.",
        "chat.answer.sugar" => "Keep added sugar under 10% of calories; fruit is fine.",
        "chat.answer.plateau" => {
            "Plateaus are normal. Check portions for a week before cutting further."
        }
        "chat.answer.training" => "2-4 strength sessions a week protect muscle while you cut.",
        "chat.answer.sleep" => "7-9 hours. Poor sleep drives hunger hormones up.",
        "chat.answer.cheat_meal" => "One planned free meal a week is fine; a free day is not.",
        "chat.answer.supplements" => {
            "Food first. Creatine and vitamin D are the only broadly useful ones."
        }
        "chat.answer.on_topic_hint" => {
            "I'm best at nutrition questions. Try one of these:"
        }
        _ => return None,
    };
    Some(text)
}

/// "meal.loss.lunch.baked_fish_salad" -> "baked fish salad"
fn humanize(key: &str) -> String {
    key.rsplit('.').next().unwrap_or(key).replace('_', " ")
}

impl Translator for EnTranslator {
    fn translate_with(&self, key: &str, params: &[(&str, String)]) -> String {
        let mut out = template(key)
            .map(str::to_string)
            .unwrap_or_else(|| humanize(key));
        for (name, value) in params {
            out = out.replace(&format!("{{{}}}", name), value);
        }
        out
    }
}
