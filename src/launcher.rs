//! Command-line flag parsing and collector enablement (§4.8), grounded on
//! `original_source/main.c`'s `initialize()`.

use crate::collector::{all_collectors, Collector};
use crate::config::Config;
use crate::errors::LaunchError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tristate {
    Off,
    Undef,
    On,
}

/// Parses `argv` (excluding the program name) into a `Config` plus the ordered,
/// initialized list of enabled collectors. Registration order is preserved; a
/// collector flag matches by first-match-wins against `--<name>-` (§4.8).
pub fn launch(argv: &[String]) -> Result<(Config, Vec<Box<dyn Collector>>), LaunchError> {
    let mut collectors = all_collectors();
    let mut enabled = vec![Tristate::Undef; collectors.len()];
    let mut coll_args: Vec<Vec<String>> = vec![Vec::new(); collectors.len()];
    let mut default_enabled = Tristate::On;
    let mut config = Config::default();

    for arg in argv {
        if let Some((i, carg)) = match_collector_flag(&collectors, arg) {
            if carg == "on" {
                enabled[i] = Tristate::On;
                default_enabled = Tristate::Off;
            } else if carg == "off" {
                enabled[i] = Tristate::Off;
            } else if collectors[i].has_args() {
                coll_args[i].push(carg.to_string());
            } else {
                return Err(LaunchError::UnexpectedCollectorArg {
                    collector: collectors[i].name().to_string(),
                    arg: carg.to_string(),
                });
            }
            continue;
        }

        if let Some(port) = arg.strip_prefix("--port=") {
            config.port = port
                .parse()
                .map_err(|_| LaunchError::UnknownArgument(arg.clone()))?;
        } else if arg == "--foreground" {
            config.foreground = true;
        } else if let Some(path) = arg.strip_prefix("--pidfile=") {
            config.pidfile = Some(path.into());
        } else if let Some(level) = arg.strip_prefix("--log-level=") {
            config.log_level = level.to_string();
        } else {
            return Err(LaunchError::UnknownArgument(arg.clone()));
        }
    }

    for state in &mut enabled {
        if *state == Tristate::Undef {
            *state = default_enabled;
        }
    }

    let mut selected: Vec<Box<dyn Collector>> = Vec::new();
    for (i, mut collector) in collectors.drain(..).enumerate() {
        if enabled[i] != Tristate::On {
            continue;
        }
        collector.init(&coll_args[i])?;
        selected.push(collector);
    }

    Ok((config, selected))
}

/// Matches `--<name>-<rest>` against the registered collectors in order, returning
/// the index and the `<rest>` portion on the first match.
fn match_collector_flag<'a>(collectors: &[Box<dyn Collector>], arg: &'a str) -> Option<(usize, &'a str)> {
    let stripped = arg.strip_prefix("--")?;
    for (i, c) in collectors.iter().enumerate() {
        let name = c.name();
        if let Some(rest) = stripped.strip_prefix(name) {
            if let Some(carg) = rest.strip_prefix('-') {
                return Some((i, carg));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_all_collectors() {
        let (_, collectors) = launch(&[]).unwrap();
        assert_eq!(collectors.len(), all_collectors().len());
    }

    #[test]
    fn explicit_on_flips_default_to_off() {
        let argv: Vec<String> = vec!["--cpu-on".to_string()];
        let (_, collectors) = launch(&argv).unwrap();
        assert_eq!(collectors.len(), 1);
        assert_eq!(collectors[0].name(), "cpu");
    }

    #[test]
    fn explicit_off_suppresses_a_default_on_collector() {
        let argv: Vec<String> = vec!["--uname-off".to_string()];
        let (_, collectors) = launch(&argv).unwrap();
        assert!(collectors.iter().all(|c| c.name() != "uname"));
        assert_eq!(collectors.len(), all_collectors().len() - 1);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(launch(&["--bogus".to_string()]).is_err());
    }

    #[test]
    fn collector_arg_on_no_arg_collector_is_rejected() {
        assert!(launch(&["--uname-dir=/tmp".to_string()]).is_err());
    }

    #[test]
    fn port_and_foreground_flags_are_parsed() {
        let argv: Vec<String> = vec!["--port=9200".to_string(), "--foreground".to_string()];
        let (config, _) = launch(&argv).unwrap();
        assert_eq!(config.port, 9200);
        assert!(config.foreground);
    }
}
