//! Main CLI application

use crate::config::{self, LoadedConfig};
use crate::error::RaskError;
use crate::logger::{Logger, Verbosity};
use crate::runner::{
    envset, mutate, ExecutionEngine, ExecutionOptions, ShellContext,
};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::path::PathBuf;

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Parsed project configuration
    project: LoadedConfig,
    /// Logger handle, still buffering until verbosity is known
    logger: Logger,
}

impl App {
    /// Create a new app with automatic config discovery
    pub fn new(logger: Logger) -> Result<Self, RaskError> {
        let project = config::load_project_auto(&logger)?;
        let command = build_command(&project);
        Ok(App {
            command,
            project,
            logger,
        })
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf, logger: Logger) -> Result<Self, RaskError> {
        let project = config::load_project(&path, &logger)?;
        let command = build_command(&project);
        Ok(App {
            command,
            project,
            logger,
        })
    }

    /// Run the application with command line arguments
    pub async fn run(mut self) -> Result<(), RaskError> {
        let matches = self.command.clone().get_matches();

        self.logger.configure(get_verbosity(&matches));

        let (action, sub) = match matches.subcommand() {
            Some((name, sub_matches)) => (name.to_string(), sub_matches.clone()),
            None => {
                // No action specified, show help
                self.command.print_help()?;
                println!();
                return Ok(());
            }
        };

        let options = options_from_matches(&sub);
        let ctx = self.build_context(&sub);
        let engine = ExecutionEngine::new(self.project, ctx, self.logger.clone());

        match action.as_str() {
            "run" => {
                let task = task_arg(&sub);
                engine.run(&task, options).await
            }
            "concurrent" => {
                let tasks: Vec<String> = sub
                    .get_many::<String>("tasks")
                    .map(|vals| vals.cloned().collect())
                    .unwrap_or_default();
                engine.concurrent(&tasks, options).await
            }
            "envs" => {
                let task = task_arg(&sub);
                let literal = sub.get_one::<String>("list").map(String::as_str);
                let file = sub.get_one::<String>("env-file").map(PathBuf::from);
                let sets = envset::parse_env_sets(literal, file.as_deref())
                    .map_err(RaskError::Execution)?;
                engine.envs(&task, sets, options).await
            }
            _ => Ok(()),
        }
    }

    /// Build the shell context for this invocation: project root as the
    /// working directory, .env additions, and the coordination state that
    /// nested rask invocations inherit through the environment.
    fn build_context(&self, sub: &ArgMatches) -> ShellContext {
        let mut ctx = ShellContext::new().with_working_dir(self.project.root.clone());
        if let Some(interpreter) = &self.project.config.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }

        for (key, value) in config::load_dotenv(&self.project.root) {
            ctx.env.insert(key, value);
        }

        let flags: Vec<String> = sub
            .get_many::<String>("flags")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default();
        mutate::merge_custom_flags(&mut ctx, &flags);

        let expand =
            sub.get_flag("expand-archetype") || std::env::var_os(mutate::EXPAND_ENV).is_some();
        if expand {
            ctx.expand_archetype = true;
            ctx.env
                .insert(mutate::EXPAND_ENV.to_string(), "1".to_string());
        }

        ctx
    }
}

fn task_arg(sub: &ArgMatches) -> String {
    sub.get_one::<String>("task").cloned().unwrap_or_default()
}

/// Build the clap command from configuration
fn build_command(project: &LoadedConfig) -> Command {
    let name = project
        .config
        .name
        .clone()
        .unwrap_or_else(|| "rask".to_string());

    let mut cmd = Command::new(name)
        .version(env!("CARGO_PKG_VERSION"))
        .about("A fast, archetype-aware task runner")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to rask.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(with_shared_args(
            Command::new("run").about("Run a single task").arg(
                Arg::new("task")
                    .value_name("TASK")
                    .help("Task to run")
                    .required(true),
            ),
        ))
        .subcommand(with_shared_args(
            Command::new("concurrent")
                .about("Run several tasks in parallel")
                .arg(
                    Arg::new("tasks")
                        .value_name("TASKS")
                        .help("Tasks to run")
                        .num_args(1..)
                        .required(true),
                )
                .arg(queue_arg())
                .arg(no_bail_arg()),
        ))
        .subcommand(with_shared_args(
            Command::new("envs")
                .about("Run a task once per environment set")
                .arg(
                    Arg::new("task")
                        .value_name("TASK")
                        .help("Task to run")
                        .required(true),
                )
                .arg(
                    Arg::new("list")
                        .long("list")
                        .value_name("JSON")
                        .help("Literal JSON list of environment objects"),
                )
                .arg(
                    Arg::new("env-file")
                        .long("env-file")
                        .value_name("FILE")
                        .help("File containing a JSON list of environment objects"),
                )
                .group(
                    ArgGroup::new("sets")
                        .args(["list", "env-file"])
                        .required(true),
                )
                .arg(queue_arg())
                .arg(no_bail_arg()),
        ));

    // List the project's tasks in help output
    let mut tasks: Vec<&String> = project.config.scripts.keys().collect();
    tasks.sort();
    if !tasks.is_empty() {
        let list = tasks
            .iter()
            .map(|t| format!("  {}", t))
            .collect::<Vec<_>>()
            .join("\n");
        cmd = cmd.after_help(format!("Tasks:\n{}", list));
    }

    cmd
}

/// Arguments shared by every action
fn with_shared_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("tries")
            .long("tries")
            .value_name("N")
            .help("Number of attempts for the main command (default 1)"),
    )
    .arg(
        Arg::new("buffer")
            .long("buffer")
            .help("Buffer command output and flush it when the command closes")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("setup")
            .long("setup")
            .value_name("TASK")
            .help("Task whose process stays alive for the whole invocation"),
    )
    .arg(
        Arg::new("expand-archetype")
            .long("expand-archetype")
            .help("Rewrite the providing archetype's node_modules path to its real location")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("flags")
            .value_name("FLAGS")
            .help("Flags after -- are appended to the main command")
            .num_args(0..)
            .allow_hyphen_values(true)
            .last(true),
    )
}

fn queue_arg() -> Arg {
    Arg::new("queue")
        .long("queue")
        .value_name("N")
        .help("Maximum number of tasks running at once (default unlimited)")
}

fn no_bail_arg() -> Arg {
    Arg::new("no-bail")
        .long("no-bail")
        .help("Keep running the remaining tasks after a failure")
        .action(ArgAction::SetTrue)
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Build execution options from a subcommand's matches.
///
/// `tries` and `queue` are free-form strings here: anything that is not a
/// positive integer quietly falls back to the default.
fn options_from_matches(sub: &ArgMatches) -> ExecutionOptions {
    let tries = parse_positive(sub.get_one::<String>("tries")).unwrap_or(1);
    let queue = sub
        .try_get_one::<String>("queue")
        .ok()
        .flatten()
        .and_then(|raw| parse_positive(Some(raw)))
        .map(|n| n as usize);
    let no_bail = sub
        .try_get_one::<bool>("no-bail")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false);

    ExecutionOptions::default()
        .with_tries(tries)
        .with_queue(queue)
        .with_buffer(sub.get_flag("buffer"))
        .with_bail(!no_bail)
        .with_setup(sub.get_one::<String>("setup").cloned())
}

fn parse_positive(raw: Option<&String>) -> Option<u32> {
    raw.and_then(|s| s.parse::<u32>().ok()).filter(|n| *n > 0)
}

/// Run the CLI application
pub async fn run() -> Result<(), RaskError> {
    let logger = Logger::deferred();

    // Check if --file flag is provided first
    let args: Vec<String> = std::env::args().collect();
    let file_path = extract_file_arg(&args);

    let app = match file_path {
        Some(path) => App::with_config_file(path, logger.clone()),
        None => App::new(logger.clone()),
    };

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            // Nothing was printed yet; make sure buffered context shows up.
            logger.configure(Verbosity::Normal);
            return Err(e);
        }
    };

    app.run().await
}

/// Extract --file argument before clap parsing. Everything after a `--`
/// separator belongs to the task, not to rask.
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if args[i] == "--" {
            break;
        }
        if (args[i] == "--file" || args[i] == "-f") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }
    None
}
