use auditlens_core::{AppError, AppResult};
use auditlens_domain::FilterCriteria;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};

const DEFAULT_SHOW_COUNT: usize = 20;

#[derive(Parser, Debug)]
#[command(
    name = "auditlens",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_help_flag = true,
    help_template = "commands:\n{subcommands}"
)]
struct CommandLine {
    #[command(subcommand)]
    command: Command,
}

/// One line of viewer input.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace all filters, e.g. filter actor="Jane Doe" from=2024-01-01
    Filter(FilterArgs),
    /// Drop all filters
    Clear,
    /// Report the distance from the bottom of the list in pixels
    Scroll { distance: u32 },
    /// Load the next page
    More,
    /// Print the last records
    Show {
        #[arg(default_value_t = DEFAULT_SHOW_COUNT)]
        count: usize,
    },
    /// List entity names
    Entities,
    /// Print this help
    Help,
    /// Stop the viewer
    #[command(alias = "exit")]
    Quit,
}

/// Filter terms given as `key=value`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct FilterArgs {
    /// actor|author, path, operation, entity, from, to (YYYY-MM-DD)
    #[arg(value_name = "KEY=VALUE", value_parser = parse_term)]
    terms: Vec<FilterTerm>,
}

impl FilterArgs {
    /// Folds the terms into criteria; a later term overrides an earlier one.
    #[must_use]
    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::default();

        for term in &self.terms {
            match term {
                FilterTerm::Actor(value) => criteria.actor = Some(value.clone()),
                FilterTerm::Path(value) => criteria.api_path = Some(value.clone()),
                FilterTerm::Operation(value) => criteria.operation = Some(value.clone()),
                FilterTerm::Entity(value) => criteria.entity_name = Some(value.clone()),
                FilterTerm::From(date) => criteria.from = Some(*date),
                FilterTerm::To(date) => criteria.to = Some(*date),
            }
        }

        criteria
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterTerm {
    Actor(String),
    Path(String),
    Operation(String),
    Entity(String),
    From(NaiveDate),
    To(NaiveDate),
}

impl Command {
    /// Parses one input line; blank lines yield `None`.
    ///
    /// The line is split with shell quoting rules, so values containing
    /// spaces are written as `actor="Jane Doe"`.
    pub fn from_line(line: &str) -> AppResult<Option<Self>> {
        let words = shlex::split(line).ok_or_else(|| {
            AppError::Validation(format!("unbalanced quotes in '{}'", line.trim()))
        })?;
        if words.is_empty() {
            return Ok(None);
        }

        match CommandLine::try_parse_from(words) {
            Ok(parsed) => Ok(Some(parsed.command)),
            Err(error) => Err(AppError::Validation(
                error.render().to_string().trim_end().to_owned(),
            )),
        }
    }
}

/// Renders the command overview.
pub fn help() -> String {
    CommandLine::command().render_help().to_string()
}

fn parse_term(pair: &str) -> Result<FilterTerm, String> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("'{pair}' must be key=value"))?;

    match key {
        "actor" | "author" => Ok(FilterTerm::Actor(value.to_owned())),
        "path" => Ok(FilterTerm::Path(value.to_owned())),
        "operation" => Ok(FilterTerm::Operation(value.to_owned())),
        "entity" => Ok(FilterTerm::Entity(value.to_owned())),
        "from" => parse_date(key, value).map(FilterTerm::From),
        "to" => parse_date(key, value).map(FilterTerm::To),
        _ => Err(format!("unknown filter key '{key}'")),
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|error| format!("invalid {key} date '{value}': {error}"))
}

#[cfg(test)]
mod tests {
    use auditlens_core::AppError;
    use auditlens_domain::FilterCriteria;
    use chrono::NaiveDate;

    use super::{Command, help};

    fn parse(line: &str) -> Option<Command> {
        Command::from_line(line).unwrap_or_else(|_| unreachable!())
    }

    fn criteria(line: &str) -> FilterCriteria {
        let Some(Command::Filter(args)) = parse(line) else {
            panic!("expected a filter command");
        };
        args.criteria()
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse("   "), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn filter_collects_known_keys() {
        let expected = FilterCriteria {
            actor: Some("alice".to_owned()),
            entity_name: Some("Project".to_owned()),
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..FilterCriteria::default()
        };

        assert_eq!(
            criteria("filter actor=alice entity=Project from=2024-01-01"),
            expected
        );
    }

    #[test]
    fn quoted_value_keeps_its_spaces() {
        assert_eq!(
            criteria("filter actor=\"Unknown User\"").actor.as_deref(),
            Some("Unknown User")
        );
        assert_eq!(
            criteria("filter 'author=Unknown User' to=2024-02-01"),
            FilterCriteria {
                actor: Some("Unknown User".to_owned()),
                to: NaiveDate::from_ymd_opt(2024, 2, 1),
                ..FilterCriteria::default()
            }
        );
    }

    #[test]
    fn filter_value_may_contain_separators() {
        assert_eq!(
            criteria("filter path=/api/x=1;y").api_path.as_deref(),
            Some("/api/x=1;y")
        );
    }

    #[test]
    fn empty_filter_clears_every_dimension() {
        assert!(criteria("filter").is_empty());
    }

    #[test]
    fn scroll_and_show_take_numbers() {
        assert_eq!(parse("scroll 250"), Some(Command::Scroll { distance: 250 }));
        assert_eq!(parse("show"), Some(Command::Show { count: 20 }));
        assert_eq!(parse("show 5"), Some(Command::Show { count: 5 }));
        assert_eq!(parse("exit"), Some(Command::Quit));
        assert_eq!(parse("help"), Some(Command::Help));
    }

    #[test]
    fn malformed_input_is_rejected() {
        for line in [
            "scroll",
            "scroll far",
            "filter actor",
            "filter color=red",
            "filter from=01/02/2024",
            "filter actor=\"Unknown User",
            "launch",
        ] {
            assert!(
                matches!(Command::from_line(line), Err(AppError::Validation(_))),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn help_lists_every_command() {
        let text = help();

        for name in ["filter", "clear", "scroll", "more", "show", "entities", "quit"] {
            assert!(text.contains(name), "help is missing {name}");
        }
    }
}
