use clap::ValueEnum;

/// Rewrites a message body before it is placed in the SEND payload.
pub trait MessageFilter: Send + Sync {
    fn apply(&self, message: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl MessageFilter for Passthrough {
    fn apply(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Collapses runs of blank spaces to a single space and trims the ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollapseSpaces;

impl MessageFilter for CollapseSpaces {
    fn apply(&self, message: &str) -> String {
        message
            .split(' ')
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FilterKind {
    Passthrough,
    #[default]
    CollapseSpaces,
}

impl FilterKind {
    pub fn build(self) -> Box<dyn MessageFilter> {
        match self {
            FilterKind::Passthrough => Box::new(Passthrough),
            FilterKind::CollapseSpaces => Box::new(CollapseSpaces),
        }
    }
}
