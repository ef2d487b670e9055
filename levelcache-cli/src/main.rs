use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use levelcache::{CacheConfig, EvictionPolicy, LevelCache, LevelConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "levelcache-cli")]
#[command(about = "LevelCache CLI - drive a multi-level cache from the terminal", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache name (overrides the configuration file)
    #[arg(short, long)]
    name: Option<String>,

    /// Maximum number of levels (overrides the configuration file)
    #[arg(long)]
    max_levels: Option<usize>,

    /// Level to create at startup, as CAPACITY:POLICY (repeatable)
    #[arg(short, long = "level", value_parser = parse_level)]
    levels: Vec<LevelConfig>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through a two-level cascade, printing every level after each step
    Demo,
    /// Time insertions and lookups against the configured levels
    Bench {
        /// Number of random-key insertions
        #[arg(long, default_value_t = 200_000)]
        inserts: usize,

        /// Number of lookups
        #[arg(long, default_value_t = 200_000)]
        reads: usize,

        /// Writer threads (defaults to the configured concurrency level)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Interactive shell (the default)
    Repl,
}

fn parse_level(value: &str) -> std::result::Result<LevelConfig, String> {
    let (capacity, policy) = match value.split_once(':') {
        Some((capacity, policy)) => (capacity, policy),
        None => (value, "LRU"),
    };
    let capacity = capacity
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid capacity '{}': {}", capacity, e))?;
    Ok(LevelConfig {
        capacity,
        policy: EvictionPolicy::from(policy),
    })
}

fn build_config(args: &Args) -> Result<CacheConfig> {
    let mut config = match &args.config {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CacheConfig::default(),
    };

    if let Some(name) = &args.name {
        config.cache_name = name.clone();
    }
    if let Some(max_levels) = args.max_levels {
        config.max_levels = max_levels;
    }
    config.levels.extend(args.levels.iter().cloned());
    Ok(config)
}

fn init_tracing(config: &CacheConfig, json: bool) {
    // Verbose cache internals only when the configuration asks for logging
    let default_filter = if config.logging_enabled {
        "info,levelcache=debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

struct CacheShell {
    cache: LevelCache,
}

impl CacheShell {
    fn new(cache: LevelCache) -> Self {
        Self { cache }
    }

    fn execute_command(&self, command: &str, args: &[String]) -> Result<String> {
        let start = Instant::now();

        let response = match command.to_uppercase().as_str() {
            "PUT" | "SET" => self.cmd_put(args)?,
            "GET" => self.cmd_get(args)?,
            "MSET" => self.cmd_mset(args)?,
            "MGET" => self.cmd_mget(args)?,
            "DEL" | "DELETE" => self.cmd_del(args)?,
            "ADD" | "ADDLEVEL" => self.cmd_add_level(args)?,
            "REMOVE" | "REMOVELEVEL" => self.cmd_remove_level(args)?,
            "LEVELS" => self.cmd_levels(),
            "DISPLAY" => self.cache.display(),
            "SNAPSHOT" => serde_json::to_string_pretty(&self.cache.snapshot())?,
            "STATS" | "INFO" => self.cmd_stats()?,
            "CLEAR" | "FLUSHALL" => {
                self.cache.clear();
                "OK".green().to_string()
            }
            "HELP" => help_text(),
            _ => return Err(anyhow!("Unknown command: {}", command)),
        };

        let elapsed = start.elapsed();
        Ok(format!(
            "{}\n{}",
            response,
            format!("({:.2?})", elapsed).dimmed()
        ))
    }

    fn cmd_put(&self, args: &[String]) -> Result<String> {
        let [key, value] = args else {
            return Err(anyhow!("Usage: PUT key value"));
        };
        self.cache.put(key.as_str(), value.as_str())?;
        Ok("OK".green().to_string())
    }

    fn cmd_get(&self, args: &[String]) -> Result<String> {
        let [key] = args else {
            return Err(anyhow!("Usage: GET key"));
        };
        Ok(format_value(self.cache.get(key)?))
    }

    fn cmd_mset(&self, args: &[String]) -> Result<String> {
        if args.is_empty() || args.len() % 2 != 0 {
            return Err(anyhow!("Usage: MSET k1 v1 [k2 v2 ...]"));
        }
        let pairs = args
            .chunks(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()));
        self.cache.put_all(pairs)?;
        Ok("OK".green().to_string())
    }

    fn cmd_mget(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow!("Usage: MGET key [key ...]"));
        }
        let values = self.cache.get_all(args)?;
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, value)| format!("{}) {}", i + 1, format_value(value)))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn cmd_del(&self, args: &[String]) -> Result<String> {
        let [key] = args else {
            return Err(anyhow!("Usage: DEL key"));
        };
        let removed = self.cache.remove(key)?;
        Ok(format!("(integer) {}", u8::from(removed.is_some())))
    }

    fn cmd_add_level(&self, args: &[String]) -> Result<String> {
        let (capacity, policy) = match args {
            [capacity] => (capacity, "LRU"),
            [capacity, policy] => (capacity, policy.as_str()),
            _ => return Err(anyhow!("Usage: ADD capacity [LRU|LFU]")),
        };
        let capacity: usize = capacity
            .parse()
            .with_context(|| format!("invalid capacity '{}'", capacity))?;
        let id = self.cache.add_level(capacity, policy)?;
        Ok(format!("Added L{}", id).green().to_string())
    }

    fn cmd_remove_level(&self, args: &[String]) -> Result<String> {
        let [id] = args else {
            return Err(anyhow!("Usage: REMOVE level_id"));
        };
        let id: usize = id
            .parse()
            .with_context(|| format!("invalid level id '{}'", id))?;
        self.cache.remove_level(id)?;
        Ok("OK".green().to_string())
    }

    fn cmd_levels(&self) -> String {
        let levels = self.cache.levels();
        if levels.is_empty() {
            return "(no levels)".dimmed().to_string();
        }
        levels
            .iter()
            .map(|level| {
                format!(
                    "L{}  {}  {}/{}",
                    level.id, level.policy, level.len, level.capacity
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn cmd_stats(&self) -> Result<String> {
        let stats = self.cache.stats();
        let body = serde_json::json!({
            "name": self.cache.name(),
            "status": self.cache.status(),
            "levels": self.cache.level_count(),
            "keys": self.cache.len(),
            "stats": stats,
            "hit_rate": stats.hit_rate(),
        });
        Ok(serde_json::to_string_pretty(&body)?)
    }
}

fn format_value(value: Option<String>) -> String {
    match value {
        Some(value) => format!("\"{}\"", value),
        None => "(nil)".dimmed().to_string(),
    }
}

fn help_text() -> String {
    format!(
        r#"{}

{}
  PUT key value              Store value in L1, cascading evictions downwards
  GET key                    Get the value of key
  MSET k1 v1 [k2 v2 ...]     Store multiple keys in order
  MGET key [key ...]         Get values of multiple keys
  DEL key                    Drop key from whichever level holds it

{}
  ADD capacity [LRU|LFU]     Append a level below the existing ones
  REMOVE id                  Remove a level; lower levels move up
  LEVELS                     List levels with occupancy
  DISPLAY                    Show the entries of every level
  SNAPSHOT                   Dump every level as JSON
  CLEAR                      Drop all levels and entries

{}
  STATS                      Hit/miss and cascade counters
  HELP                       Show this help
  QUIT                       Leave the shell"#,
        "LevelCache Commands".bold(),
        "Keys:".yellow(),
        "Levels:".yellow(),
        "Server:".yellow(),
    )
}

fn run_demo(mut config: CacheConfig) -> Result<()> {
    config.levels.clear();
    let cache = LevelCache::new(config)?;
    cache.add_level(3, "LRU")?;
    cache.add_level(2, "LRU")?;
    info!("{}", cache.display());

    for (key, value) in [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")] {
        cache.put(key, value)?;
        info!("{} {}={}\n{}", "PUT".bold(), key, value, cache.display());
    }

    info!(
        "{} a -> {}",
        "GET".bold(),
        format_value(cache.get("a")?)
    );

    for (key, value) in [("e", "5"), ("f", "6")] {
        cache.put(key, value)?;
        info!("{} {}={}\n{}", "PUT".bold(), key, value, cache.display());
    }

    info!(
        "{} a -> {}",
        "GET".bold(),
        format_value(cache.get("a")?)
    );
    Ok(())
}

fn run_bench(mut config: CacheConfig, inserts: usize, reads: usize, threads: Option<usize>) -> Result<()> {
    if config.levels.is_empty() {
        let mut builder = CacheConfig::builder();
        for capacity in [10, 50, 90] {
            builder = builder.level(capacity, EvictionPolicy::Lru);
        }
        config.levels = builder.build().levels;
    }
    let threads = threads.unwrap_or(config.concurrency_level).max(1);
    let cache = LevelCache::new(config)?;

    info!(
        "Benchmarking '{}' with {} levels, {} writer threads",
        cache.name(),
        cache.level_count(),
        threads
    );

    // Insertion
    let per_thread = inserts / threads;
    let start = Instant::now();
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || -> Result<Vec<String>> {
                let mut keys = Vec::with_capacity(per_thread);
                for _ in 0..per_thread {
                    let key = uuid::Uuid::new_v4().to_string();
                    cache.put(key.as_str(), "foobar")?;
                    keys.push(key);
                }
                Ok(keys)
            })
        })
        .collect();

    let mut keys = Vec::with_capacity(inserts);
    for worker in workers {
        let inserted = worker
            .join()
            .map_err(|_| anyhow!("benchmark worker panicked"))??;
        keys.extend(inserted);
    }
    let insert_elapsed = start.elapsed();
    let total_inserts = keys.len();

    // Retrieval, newest keys first so the top levels are exercised
    cache.reset_stats();
    let start = Instant::now();
    if !keys.is_empty() {
        for i in 0..reads {
            let key = &keys[keys.len() - 1 - (i % keys.len())];
            cache.get(key)?;
        }
    }
    let read_elapsed = start.elapsed();

    info!(
        "AverageInsertionTime: {:.3} micros ({} inserts)",
        average_micros(insert_elapsed, total_inserts),
        total_inserts
    );
    info!(
        "AverageRetrievalTime: {:.3} micros ({} reads)",
        average_micros(read_elapsed, reads),
        reads
    );

    let stats = cache.stats();
    info!(
        "HitRatio: {:.2}%  MissRatio: {:.2}%",
        stats.hit_rate() * 100.0,
        (1.0 - stats.hit_rate()) * 100.0
    );
    info!("Resident keys: {}", cache.len());
    Ok(())
}

fn average_micros(elapsed: Duration, ops: usize) -> f64 {
    if ops == 0 {
        0.0
    } else {
        elapsed.as_secs_f64() * 1_000_000.0 / ops as f64
    }
}

fn run_interactive(cache: LevelCache) -> Result<()> {
    info!(
        "{}",
        format!("LevelCache CLI v{}", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    info!(
        "Cache '{}' with {} levels (max {})",
        cache.name(),
        cache.level_count(),
        cache.max_levels()
    );
    info!("Type {} for available commands\n", "HELP".bold());

    let shell = CacheShell::new(cache);
    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = format!("{}> ", format!("levelcache {}", shell.cache.name()).green());
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                rl.add_history_entry(&line)?;

                let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
                let Some((cmd, args)) = parts.split_first() else {
                    continue;
                };

                if cmd.eq_ignore_ascii_case("QUIT") || cmd.eq_ignore_ascii_case("EXIT") {
                    info!("Goodbye!");
                    break;
                }

                match shell.execute_command(cmd, args) {
                    Ok(output) => info!("{}", output),
                    Err(e) => {
                        error!(error = %e, "{}", format!("Error: {}", e).red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                info!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;
    init_tracing(&config, args.json);

    match args.command {
        Some(Command::Demo) => run_demo(config),
        Some(Command::Bench {
            inserts,
            reads,
            threads,
        }) => run_bench(config, inserts, reads, threads),
        Some(Command::Repl) | None => {
            let cache = LevelCache::new(config)?;
            run_interactive(cache)
        }
    }
}
