use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Install the process-wide logger on stderr, keeping stdout for generated code.
pub fn init(verbose: bool, headless: bool) {
    let level = if verbose { LevelFilter::Info } else { LevelFilter::Warn };
    let colors = if headless { ColorChoice::Never } else { ColorChoice::Auto };
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_time_level(LevelFilter::Off)
        .build();
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, colors);
}
