use logistique_bc_rust::{create_pool, router, run_migrations, AppConfig, AppState};
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 使用本地时间格式
    let level: LevelFilter = config.log.level.parse().unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_max_level(level)
        .init();

    info!("Starting server with config: {:?}", config);
    if config.uses_default_secret() {
        warn!("auth.token_secret 未配置, 使用默认密钥; 请设置 TOKEN_SECRET");
    }

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    if config.database.run_migrations {
        run_migrations(&pool).await?;
        info!("Migrations applied");
    }

    let app = router(AppState::new(pool, &config));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET/POST /api/delivery       - livraisons (?rapportBC= pour le rapprochement)");
    info!("  GET/POST /api/orders         - bons de commande");
    info!("  GET      /api/orders/incoming - commandes à recevoir");
    info!("  GET      /api/export?type=   - export CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
