//! Factor sync CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};

use factor_collector::modules::{
    resolve_range, sync_instruments, FactorStrategy, PriceStrategy, SyncOrchestrator,
    SyncStrategy, UnitMode,
};
use factor_collector::{SyncConfig, SyncReport};
use factor_core::{init_logging, DateRange, LogConfig, LogFormat, TableName};
use factor_data::{
    DataProvider, Database, FactorSink, HttpDataProvider, InstrumentSink, MemoryStore,
    PgFactorStore, PgInstrumentStore,
};

#[derive(Parser)]
#[command(name = "factor-collector")]
#[command(about = "Incremental factor/price synchronizer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// 로그 파일 경로 (기본: LOG_FILE)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// 데이터베이스 대신 메모리에 저장 (결과 확인용)
    #[arg(long, global = true)]
    dry_run: bool,

    /// 실행 결과를 JSON으로 출력
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 팩터 데이터 동기화
    Factors {
        /// 팩터 유형 (기본: FACTOR_TYPE)
        #[arg(long)]
        factor_type: Option<String>,

        /// 저장 테이블 (기본: FACTOR_TABLE)
        #[arg(long)]
        table: Option<String>,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// 일봉 시세 동기화
    Prices {
        /// 저장 테이블 (기본: PRICE_TABLE)
        #[arg(long)]
        table: Option<String>,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// 종목 마스터 동기화
    Instruments {
        /// 종목 유형 (기본: INSTRUMENT_TYPE)
        #[arg(long)]
        instrument_type: Option<String>,
    },

    /// 데몬 모드: 주기적으로 최근 N일 팩터/시세 동기화
    Daemon {
        /// 매 실행 시 동기화할 최근 일수 (기본: DAEMON_RECENT_DAYS)
        #[arg(long)]
        recent_days: Option<u32>,
    },
}

#[derive(Args, Clone)]
struct SyncArgs {
    /// 시작일 (YYYYMMDD 또는 YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// 종료일 (기본: 오늘)
    #[arg(long)]
    end: Option<String>,

    /// 오늘 포함 최근 N일
    #[arg(long, conflicts_with = "start")]
    recent_days: Option<u32>,

    /// 처리 모드 (day: 거래일별, range: 구간 한 번에)
    #[arg(long, default_value = "day")]
    mode: UnitMode,

    /// 청크당 종목 수 (기본: SYNC_CHUNK_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,

    /// 실패한 처리 단위 자동 재시도
    #[arg(long)]
    retry_failed: bool,
}

/// 실행 중 공유하는 저장소 핸들.
struct Sinks {
    factors: Arc<dyn FactorSink>,
    instruments: Arc<dyn InstrumentSink>,
    database: Option<Database>,
}

impl Sinks {
    async fn open(config: &SyncConfig, dry_run: bool) -> anyhow::Result<Self> {
        if dry_run {
            tracing::warn!("dry-run 모드: 메모리 저장소 사용");
            let store = Arc::new(MemoryStore::new());
            return Ok(Self {
                factors: store.clone(),
                instruments: store,
                database: None,
            });
        }

        let database = Database::connect(&config.database()?)
            .await
            .context("데이터베이스 연결 실패")?;
        if let Err(e) = database.health_check().await {
            database.close().await;
            return Err(anyhow::anyhow!("데이터베이스 상태 확인 실패: {}", e));
        }
        tracing::info!("데이터베이스 연결 성공");

        Ok(Self {
            factors: Arc::new(PgFactorStore::new(&database)),
            instruments: Arc::new(PgInstrumentStore::new(&database)),
            database: Some(database),
        })
    }

    async fn close(self) {
        if let Some(database) = self.database {
            database.close().await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 로깅 초기화
    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config = log_config.with_level(level.as_str());
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_file(path.clone());
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("Factor Sync 시작");

    // 설정 로드
    let config = SyncConfig::from_env()?;
    tracing::debug!(provider_url = %config.provider.url, "설정 로드 완료");

    let provider: Arc<dyn DataProvider> = Arc::new(HttpDataProvider::new(config.http_provider())?);
    let sinks = Sinks::open(&config, cli.dry_run).await?;

    let result = run(&cli, &config, provider, &sinks).await;

    sinks.close().await;
    tracing::info!("Factor Sync 종료");

    result
}

async fn run(
    cli: &Cli,
    config: &SyncConfig,
    provider: Arc<dyn DataProvider>,
    sinks: &Sinks,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();

    match &cli.command {
        Commands::Factors {
            factor_type,
            table,
            sync,
        } => {
            let factor_type = factor_type
                .clone()
                .unwrap_or_else(|| config.factor.factor_type.clone());
            let table = match table {
                Some(name) => TableName::parse(name.as_str())?,
                None => config.factor.table.clone(),
            };
            let strategy = FactorStrategy::new(provider.clone(), factor_type, table)
                .with_insert_batch(config.factor.insert_batch);
            let range = range_from_args(sync, today)?;

            let report = sync_data(config, provider, sinks, Arc::new(strategy), range, sync).await?;
            print_report(&report, "팩터 동기화", cli.json)?;
        }
        Commands::Prices { table, sync } => {
            let table = match table {
                Some(name) => TableName::parse(name.as_str())?,
                None => config.price.table.clone(),
            };
            let strategy = price_strategy(config, provider.clone(), sinks, table);
            let range = range_from_args(sync, today)?;

            let report = sync_data(config, provider, sinks, Arc::new(strategy), range, sync).await?;
            print_report(&report, "시세 동기화", cli.json)?;
        }
        Commands::Instruments { instrument_type } => {
            let instrument_type = instrument_type
                .as_deref()
                .unwrap_or(&config.instrument.instrument_type);
            let report = sync_instruments(
                provider.as_ref(),
                sinks.instruments.as_ref(),
                &config.instrument.table,
                instrument_type,
            )
            .await?;
            print_report(&report, "종목 마스터 동기화", cli.json)?;
        }
        Commands::Daemon { recent_days } => {
            run_daemon(config, provider, sinks, recent_days.unwrap_or(config.daemon.recent_days))
                .await;
        }
    }

    Ok(())
}

/// 종목 마스터 테이블을 유니버스로 쓰는 시세 전략.
fn price_strategy(
    config: &SyncConfig,
    provider: Arc<dyn DataProvider>,
    sinks: &Sinks,
    table: TableName,
) -> PriceStrategy {
    PriceStrategy::new(provider, table)
        .with_insert_batch(config.price.insert_batch)
        .with_instrument_universe(sinks.instruments.clone(), config.instrument.table.clone())
}

fn range_from_args(args: &SyncArgs, today: chrono::NaiveDate) -> anyhow::Result<DateRange> {
    Ok(resolve_range(
        args.start.as_deref(),
        args.end.as_deref(),
        args.recent_days,
        today,
    )?)
}

/// 동기화 실행 후 필요하면 실패 단위 재시도.
async fn sync_data(
    config: &SyncConfig,
    provider: Arc<dyn DataProvider>,
    sinks: &Sinks,
    strategy: Arc<dyn SyncStrategy>,
    range: DateRange,
    args: &SyncArgs,
) -> anyhow::Result<SyncReport> {
    let mut engine = config.engine.clone();
    if let Some(size) = args.batch_size {
        engine.chunk_size = size;
    }

    let orchestrator = SyncOrchestrator::new(provider, sinks.factors.clone(), strategy, engine);
    let mut report = orchestrator.run(range, args.mode).await?;

    if args.retry_failed && !report.failed_units.is_empty() {
        let retry = orchestrator.retry_failed_units(&report.failed_units).await;
        retry.log_summary("실패 단위 재시도");
        report.absorb_retry(retry);
    }

    Ok(report)
}

fn print_report(report: &SyncReport, operation: &str, json: bool) -> anyhow::Result<()> {
    report.log_summary(operation);
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}

/// 데몬 모드: Ctrl-C까지 주기 실행.
async fn run_daemon(
    config: &SyncConfig,
    provider: Arc<dyn DataProvider>,
    sinks: &Sinks,
    recent_days: u32,
) {
    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}분, 최근 {}일) ===",
        config.daemon.interval_minutes,
        recent_days
    );

    let args = SyncArgs {
        start: None,
        end: None,
        recent_days: Some(recent_days),
        mode: UnitMode::Day,
        batch_size: None,
        retry_failed: true,
    };

    let mut interval = tokio::time::interval(config.daemon.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                tracing::info!("=== 동기화 실행 시작 ===");
                let range = DateRange::recent(Local::now().date_naive(), recent_days);

                // 1. 종목 마스터
                match sync_instruments(
                    provider.as_ref(),
                    sinks.instruments.as_ref(),
                    &config.instrument.table,
                    &config.instrument.instrument_type,
                )
                .await
                {
                    Ok(report) => report.log_summary("종목 마스터 동기화"),
                    Err(e) => tracing::error!("종목 마스터 동기화 실패: {}", e),
                }

                // 2. 시세
                let prices: Arc<dyn SyncStrategy> = Arc::new(price_strategy(
                    config,
                    provider.clone(),
                    sinks,
                    config.price.table.clone(),
                ));
                match sync_data(config, provider.clone(), sinks, prices, range, &args).await {
                    Ok(report) => report.log_summary("시세 동기화"),
                    Err(e) => tracing::error!("시세 동기화 실패: {}", e),
                }

                // 3. 팩터
                let factors: Arc<dyn SyncStrategy> = Arc::new(
                    FactorStrategy::new(
                        provider.clone(),
                        config.factor.factor_type.clone(),
                        config.factor.table.clone(),
                    )
                    .with_insert_batch(config.factor.insert_batch),
                );
                match sync_data(config, provider.clone(), sinks, factors, range, &args).await {
                    Ok(report) => report.log_summary("팩터 동기화"),
                    Err(e) => tracing::error!("팩터 동기화 실패: {}", e),
                }

                tracing::info!(
                    "=== 동기화 완료, 다음 실행: {}분 후 ===",
                    config.daemon.interval_minutes
                );
            }
        }
    }
}
