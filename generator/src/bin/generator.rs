use clap::Parser;
use layer_generator::{
    build_model,
    config::ApiConfig,
    dump_model,
    generate_target,
    load_registry,
    logging,
    targets,
    validate_model,
    write_target,
    GenerateError,
    GeneratorOptions,
    Selection,
    Vulkan,
};
use log::{error, info, warn};
use std::{
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

/// Generates Vulkan layer sources from the registry and a directive template
#[derive(Parser, Debug)]
#[command(name = "generator")]
struct Args {
    /// Name of the target to generate
    #[arg(required_unless_present = "list")]
    target: Option<String>,

    /// Directory the target is written to
    #[arg(short = 'o', long, default_value = ".")]
    directory: PathBuf,

    /// Path to vk.xml
    #[arg(long, default_value = Vulkan::REGISTRY_FILENAME)]
    registry: PathBuf,

    /// Include extensions whose `supported` list contains this class
    #[arg(long, default_value = "vulkan")]
    default_extensions: String,

    /// Additional extensions to include (names or regexes)
    #[arg(long, num_args = 1..)]
    extension: Vec<String>,

    /// Extensions to leave out (names or regexes)
    #[arg(long, num_args = 1..)]
    remove_extensions: Vec<String>,

    /// Restrict emitted extensions to these (names or regexes)
    #[arg(long, num_args = 1..)]
    emit_extensions: Vec<String>,

    /// Features to include (names or regexes), all when empty
    #[arg(long, num_args = 1..)]
    feature: Vec<String>,

    /// Do not wrap headers in an include guard
    #[arg(long)]
    noprotect: bool,

    /// Cross-check type references in the model
    #[arg(long)]
    validate: bool,

    /// Write a listing of the model to regdump.txt in the output directory
    #[arg(long)]
    dump: bool,

    /// Report per-directive statistics
    #[arg(long)]
    profile: bool,

    /// Report the time each phase takes
    #[arg(long)]
    time: bool,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    errfile: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Print the registered targets and exit
    #[arg(long)]
    list: bool,
}

struct Timer {
    enabled: bool,
    started: Instant,
}

impl Timer {
    fn new(enabled: bool) -> Self {
        Timer {
            enabled,
            started: Instant::now(),
        }
    }

    fn phase(&mut self, name: &str) {
        if self.enabled {
            info!("{}: {:.3}s", name, self.started.elapsed().as_secs_f64());
        }
        self.started = Instant::now();
    }
}

fn run(args: &Args, target: &'static targets::Target) -> Result<(), GenerateError> {
    let mut timer = Timer::new(args.time);
    let selection = Selection::from_lists(
        Some(args.default_extensions.as_str()),
        &args.feature,
        &args.extension,
        &args.remove_extensions,
        &args.emit_extensions,
    )?;
    let options = GeneratorOptions {
        directory: args.directory.clone(),
        protect: !args.noprotect,
        profile: args.profile,
    };

    let registry = load_registry(&args.registry)?;
    timer.phase("load registry");

    let model = build_model::<Vulkan>(&registry, &selection)?;
    timer.phase("build model");

    if args.validate {
        let problems = validate_model(&model);
        for problem in &problems {
            warn!("{}", problem);
        }
        info!("validation found {} problems", problems.len());
    }
    if args.dump {
        let path = options.directory.join("regdump.txt");
        std::fs::create_dir_all(&options.directory)
            .and_then(|_| std::fs::write(&path, dump_model(&model)))
            .map_err(|source| GenerateError::Io {
                path: path.clone(),
                source,
            })?;
        info!("dumped model to {}", path.display());
    }

    let generated = generate_target(target, &model, &options)?;
    timer.phase("generate");
    if let Some(stats) = &generated.stats {
        for s in stats {
            info!(
                "line {:>4} @{:<11} visited {:>5} emitted {:>5} in {:.3}ms",
                s.line,
                s.kind,
                s.visited,
                s.emitted,
                s.elapsed.as_secs_f64() * 1000.0,
            );
        }
    }

    write_target(&generated, &options.directory)?;
    timer.phase("write");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.errfile.as_deref(), args.quiet) {
        eprintln!("failed to open log file: {}", e);
        return ExitCode::FAILURE;
    }

    if args.list {
        for name in targets::names() {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    let Some(name) = args.target.as_deref() else {
        return ExitCode::SUCCESS;
    };
    let Some(target) = targets::find(name) else {
        error!("unknown target {:?}, see --list", name);
        return ExitCode::SUCCESS;
    };

    match run(&args, target) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}: {}", target.name, e);
            ExitCode::FAILURE
        },
    }
}
