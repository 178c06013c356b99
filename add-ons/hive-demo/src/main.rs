//! hive-demo: runs one swarm cycle against the configured store and prints the board.

use hive_core::{
    AgentCapabilities, ArtifactKind, GoalStatus, HiveConfig, HiveCore, HiveResult, Priority, Role,
};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TEAM: [(&str, Role); 4] = [
    ("research-1", Role::Researcher),
    ("design-1", Role::Designer),
    ("coder-1", Role::Coder),
    ("tester-1", Role::Tester),
];

fn run(hive: &HiveCore) -> HiveResult<()> {
    for (agent_id, role) in TEAM {
        hive.connect(Some(agent_id), AgentCapabilities::with_roles([role]));
    }

    let goal = hive.ingest_goal(
        "Ship MVP",
        "Smallest slice a paying customer will use",
        Priority::Critical,
    );

    for (i, (_, role)) in TEAM.iter().enumerate() {
        let mut payload = serde_json::Map::new();
        payload.insert("step".to_string(), json!(i + 1));
        let task = hive.decompose_to_task(
            &goal,
            &format!("{} pass on MVP", role),
            *role,
            Some(payload),
            Some(Priority::Critical),
        );

        let Some(assignment) = hive.allocate(&task.artifact_id) else {
            tracing::warn!(task_artifact_id = %task.artifact_id, role = %role, "no agent for task");
            continue;
        };

        let mut outcome = serde_json::Map::new();
        outcome.insert("success".to_string(), json!(true));
        outcome.insert("evidence".to_string(), json!(vec![format!("{}-notes", role); i + 1]));
        let result = hive.post_result(
            &assignment.assigned_agent_id,
            &task.artifact_id,
            ArtifactKind::Result,
            &format!("{} output", role),
            outcome,
            Some(0.6 + 0.1 * i as f64),
        );
        let score = hive.reinforce(&result.artifact_id);
        tracing::info!(
            artifact_id = %result.artifact_id,
            score = score.score,
            reason = %score.reason,
            "result reinforced"
        );
    }

    let threshold = hive.config().goals.convergence_threshold;
    let converged = hive.converge_goal(&goal.goal_id, threshold);
    let next = if converged {
        GoalStatus::Done
    } else {
        GoalStatus::InProgress
    };
    let goal = hive.goals().transition(&goal.goal_id, next)?;
    println!(
        "goal {} \"{}\" converged={} status={}",
        goal.goal_id, goal.title, converged, goal.status
    );

    println!("{:<18} {:<8} {:>9} {:>10}  title", "artifact", "priority", "pheromone", "confidence");
    for art in hive.board().list(Some(ArtifactKind::Result), None) {
        println!(
            "{:<18} {:<8} {:>9.3} {:>10.2}  {}",
            art.artifact_id,
            format!("{:?}", art.priority).to_lowercase(),
            art.pheromone_strength,
            art.confidence,
            art.title
        );
    }
    for row in hive.read_status(None) {
        println!("{} {} [{}]", row.goal_id, row.title, row.status);
    }
    Ok(())
}

fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[hive-demo] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match HiveConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[hive-demo] config error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        backend = %config.storage.backend,
        path = %config.storage.path,
        "starting hive demo"
    );

    let hive = match HiveCore::open(config) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("[hive-demo] failed to open hive: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = run(&hive) {
        tracing::error!(error = %e, "swarm cycle failed");
        std::process::exit(1);
    }
}
