use clap::{Parser, Subcommand};
use healthbot_core::billing::{format_price, pricing_plans};
use healthbot_core::config::service_from_env;
use healthbot_core::constants::DEFAULT_PAGE_SIZE;
use healthbot_core::engine::{AIResponse, ChatTurn};
use healthbot_core::HealthBotService;
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "healthbot")]
#[command(about = "HealthBot symptom assistant CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the doctor a single question
    Ask {
        /// The message, e.g. "I have a headache and fever"
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Interactive conversation; type "quit" to leave
    Chat,
    /// Analyse a checklist of symptom ids
    Analyze {
        /// Symptom ids, e.g. fever sore_throat
        #[arg(required = true, num_args = 1..)]
        symptoms: Vec<String>,
        /// Patient age (accepted, not used by the analysis)
        #[arg(long)]
        age: Option<u32>,
        /// Patient gender (accepted, not used by the analysis)
        #[arg(long)]
        gender: Option<String>,
    },
    /// List the symptom ids the engine knows
    Symptoms,
    /// List pricing plans
    Plans,
    /// Show a user's consultation history, newest first
    History {
        /// User id
        user_id: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: usize,
    },
    /// Show a user's payment history, newest first
    Payments {
        /// User id
        user_id: String,
    },
}

fn print_reply(reply: &AIResponse) {
    println!("{}", reply.response);
    if !reply.medications.is_empty() {
        println!("  Medications: {}", reply.medications.join(", "));
    }
    for advice in &reply.advice {
        println!("  Advice: {}", advice);
    }
}

fn chat(service: &HealthBotService) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut history: Vec<ChatTurn> = Vec::new();

    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let message = line.trim();
        if matches!(message, "quit" | "exit") {
            break;
        }
        if !message.is_empty() {
            let reply = service.ask_doctor(message, &history);
            print_reply(&reply);
            if reply.requires_follow_up {
                for question in service.engine().follow_up_questions(message) {
                    println!("  ? {}", question);
                }
            }
            history.push(ChatTurn::user(message));
            history.push(ChatTurn::ai(reply.response));
        }
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let service = service_from_env()?;

    match cli.command {
        Some(Commands::Ask { message }) => {
            let reply = service.ask_doctor(&message.join(" "), &[]);
            print_reply(&reply);
        }
        Some(Commands::Chat) => chat(&service)?,
        Some(Commands::Analyze {
            symptoms,
            age,
            gender,
        }) => {
            let analysis = service.analyze_symptoms(&symptoms, age, gender.as_deref());
            println!("Confidence: {}", analysis.confidence_level);
            println!("Possible conditions: {}", analysis.conditions.join(", "));
            println!("Medications: {}", analysis.medications.join(", "));
            for advice in &analysis.advice {
                println!("Advice: {}", advice);
            }
            for warning in &analysis.warnings {
                println!("Warning: {}", warning);
            }
        }
        Some(Commands::Symptoms) => {
            for entry in service.engine().knowledge().entries() {
                println!("{}", entry.key);
            }
        }
        Some(Commands::Plans) => {
            for plan in pricing_plans() {
                println!(
                    "{} ({}): {} for {} days, up to {} consultations",
                    plan.name,
                    plan.id,
                    format_price(plan.price, &plan.currency),
                    plan.duration_days,
                    plan.consultations_limit
                );
            }
        }
        Some(Commands::History {
            user_id,
            page,
            per_page,
        }) => {
            let history = service.list_consultations(&user_id, page, per_page)?;
            if history.consultations.is_empty() {
                println!("No consultations found.");
            }
            for c in &history.consultations {
                println!(
                    "{}  {} ({} urgency)  {}  [{}]",
                    c.created_at.format("%Y-%m-%d %H:%M"),
                    c.severity.as_str(),
                    c.urgency.as_str(),
                    c.symptoms.join(", "),
                    c.payment_status.as_str()
                );
                match &c.analysis {
                    Some(a) => println!("    {}", a.conditions.join(", ")),
                    None => println!("    (analysis available after payment)"),
                }
            }
            println!(
                "Page {} of {} ({} total)",
                history.page,
                history.total_pages().max(1),
                history.total
            );
        }
        Some(Commands::Payments { user_id }) => {
            let payments = service.list_payments(&user_id)?;
            if payments.is_empty() {
                println!("No payments found.");
            }
            for p in &payments {
                println!(
                    "{}  {}  {}  {}",
                    p.completed_at.format("%Y-%m-%d %H:%M:%S"),
                    p.payment_type.as_str(),
                    format_price(p.amount, &p.currency),
                    p.transaction_id
                );
            }
        }
        None => {
            println!("HealthBot: describe your symptoms with `healthbot ask`, or run `healthbot --help`.");
        }
    }

    Ok(())
}
