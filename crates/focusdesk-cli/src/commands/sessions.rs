use clap::Subcommand;
use focusdesk_core::storage::Database;

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List recent sessions, newest first
    List {
        /// Maximum number of sessions
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SessionsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SessionsAction::List { limit, json } => {
            let sessions = db.list_sessions(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
                return Ok(());
            }
            if sessions.is_empty() {
                println!("no sessions recorded");
                return Ok(());
            }
            for s in &sessions {
                let tasks = db.session_tasks(&s.id)?;
                println!(
                    "{}  {:>3}/{:<3} min  {:<11}  {}{}",
                    s.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                    s.actual_duration,
                    s.duration,
                    if s.completed { "completed" } else { "interrupted" },
                    s.notes,
                    if tasks.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", tasks.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", "))
                    },
                );
            }
        }
    }
    Ok(())
}
