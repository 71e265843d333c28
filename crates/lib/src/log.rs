use clap::ValueEnum;

/// Output format of the CLI log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LoggingFormat {
    #[default]
    Standard,
    Json,
}
