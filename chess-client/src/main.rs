use std::path::PathBuf;

use anyhow::{Context, Result};
use chess_client::board::ConsoleRenderer;
use chess_client::game::{GameSession, Identity};
use chess_client::network::{ClientRuntime, ConnectionManager, GameApi, UserCommand};
use chess_client::settings::ClientConfig;
use clap::Parser;
use protocol::{UserId, WsConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chess-client", version, about = "Play a server-hosted chess game from the terminal")]
struct Args {
    /// 对局编号
    #[arg(long, env = "CHESS_GAME_ID")]
    game_id: String,

    /// 配置文件路径（默认位于系统配置目录）
    #[arg(long, env = "CHESS_CONFIG")]
    config: Option<PathBuf>,

    /// 服务器 HTTP 基础地址
    #[arg(long, env = "CHESS_SERVER_URL")]
    server: Option<String>,

    #[arg(long, env = "CHESS_USER_ID")]
    user_id: Option<String>,

    #[arg(long, env = "CHESS_TOKEN")]
    token: Option<String>,

    /// 断线重连间隔（毫秒）
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,
}

impl Args {
    /// 用命令行参数覆盖文件中的配置
    fn into_config(self, mut config: ClientConfig) -> (String, ClientConfig) {
        if let Some(server) = self.server {
            config.server_url = server;
        }
        if let Some(user_id) = self.user_id {
            config.user_id = Some(user_id);
        }
        if let Some(token) = self.token {
            config.token = Some(token);
        }
        if let Some(delay) = self.reconnect_delay_ms {
            config.reconnect_delay_ms = delay;
        }
        (self.game_id, config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 先读取配置以确定日志级别，读取结果在日志初始化后再输出
    let path = args.config.clone().or_else(ClientConfig::config_path);
    let loaded = match &path {
        Some(path) => ClientConfig::read(path),
        None => Ok(None),
    };
    let file_config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => ClientConfig::default(),
    };
    let (game_id, config) = args.into_config(file_config);

    // 初始化日志
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in config.log_directives() {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match (&path, loaded) {
        (Some(path), Ok(Some(_))) => info!("Loaded config from {:?}", path),
        (Some(path), Ok(None)) => info!("Config file {:?} not found, using defaults", path),
        (Some(_), Err(e)) => tracing::warn!("{:#}, using defaults", e),
        (None, _) => tracing::warn!("No config directory available, using defaults"),
    }

    info!("Chess client starting for game {}", game_id);

    let identity = Identity {
        user_id: UserId::new(config.user_id.clone().unwrap_or_default()),
        token: config.token.clone().unwrap_or_default(),
    };

    let api = GameApi::new(config.connect_timeout())?;
    let detail = api
        .fetch_game(config.game_url(&game_id)?)
        .await
        .with_context(|| format!("failed to load game {}", game_id))?;
    let session = GameSession::from_detail(game_id, identity, detail);
    match session.player() {
        Some(color) => info!("Playing as {}", color),
        None => info!("Watching as spectator"),
    }

    let connection = ConnectionManager::connect(
        WsConnector::new(config.connect_timeout()),
        config.ws_url()?.as_str(),
        config.reconnect_delay(),
    );

    let (commands, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<UserCommand>() {
                    Ok(command) => {
                        if commands.send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("! {}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    let mut runtime = ClientRuntime::new(session, connection, ConsoleRenderer::new(std::io::stdout()));
    runtime.run(rx).await;
    Ok(())
}
