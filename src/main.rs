use taskmanager::{
    app,
    config::{AppConfig, Environment},
    state::AppState,
};

fn init_tracing(env: Environment) {
    let default_filter = match env {
        Environment::Local | Environment::Dev => "taskmanager=debug,tower_http=info",
        Environment::Prod => "taskmanager=info,tower_http=info",
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(env != Environment::Local);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.env);
    tracing::info!(env = ?config.env, "starting task manager");

    let (state, db) = AppState::init(config.clone()).await?;

    if let Some(db) = &db {
        if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }

    let router = app::build_app(state);
    app::serve(router, &config).await
}
