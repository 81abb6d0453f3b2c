use std::{
    fs::File,
    io,
    path::Path,
    sync::Once,
};

static INIT_LOGGING: Once = Once::new();

#[cfg(debug_assertions)]
const DEFAULT_LOG_FILTER: &str = concat!(env!("CARGO_CRATE_NAME"), "=debug,generator=debug");
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_FILTER: &str = concat!(env!("CARGO_CRATE_NAME"), "=info,generator=info");

/// Installs the global logger. `RUST_LOG` overrides the default filter;
/// `quiet` lowers it to warnings, `errfile` redirects output to a file.
pub fn init(errfile: Option<&Path>, quiet: bool) -> io::Result<()> {
    use env_logger::{
        Builder, Env, Target,
    };
    let target = errfile.map(File::create).transpose()?;
    INIT_LOGGING.call_once(move || {
        let default_filter = if quiet { "warn" } else { DEFAULT_LOG_FILTER };
        let cfg = Env::default()
            .default_filter_or(default_filter);
        let mut builder = Builder::from_env(cfg);
        if let Some(file) = target {
            builder.target(Target::Pipe(Box::new(file)));
        }
        builder.init();
    });
    Ok(())
}
