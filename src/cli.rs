use std::env;

use crate::error::{LensError, LensResult};
use crate::format::StreamFormat;

/// Environment variable holding default options, like gzip's `GZIP`
pub const ENV_OPTIONS: &str = "DEFLATE_LENS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensArgs {
    pub files: Vec<String>,
    /// Inputs are plain data to compress before tracing
    pub compress: bool,
    pub compression_level: u8,
    /// Literal input text, compressed before tracing
    pub text: Option<String>,
    /// Forced stream format; inferred per file when `None`
    pub format: Option<StreamFormat>,
    pub items: bool,
    pub hex: bool,
    /// (block, item) to highlight in the hex dump
    pub select: Option<(usize, usize)>,
    pub json: bool,
    pub quiet: bool,
    pub verbosity: u8,
    pub help: bool,
    pub version: bool,
}

impl Default for LensArgs {
    fn default() -> Self {
        LensArgs {
            files: Vec::new(),
            compress: false,
            compression_level: 6,
            text: None,
            format: None,
            items: false,
            hex: false,
            select: None,
            json: false,
            quiet: false,
            verbosity: 1,
            help: false,
            version: false,
        }
    }
}

impl LensArgs {
    pub fn parse() -> LensResult<Self> {
        let argv: Vec<String> = env::args().skip(1).collect();
        Self::parse_from(argv, env::var(ENV_OPTIONS).ok().as_deref())
    }

    /// Parse `argv` (without the program name), with `env_options`
    /// prepended as defaults.
    pub fn parse_from(mut argv: Vec<String>, env_options: Option<&str>) -> LensResult<Self> {
        let mut args = LensArgs::default();

        if let Some(env_str) = env_options {
            let env_args = parse_env_args(env_str);
            argv.splice(0..0, env_args);
        }

        let mut i = 0;
        let mut in_options = true;

        while i < argv.len() {
            let arg = &argv[i];

            if !in_options || !arg.starts_with('-') || arg == "-" {
                args.files.push(arg.clone());
                i += 1;
                continue;
            }

            if arg == "--" {
                in_options = false;
                i += 1;
                continue;
            }

            // Parse long options
            if let Some(long) = arg.strip_prefix("--") {
                let (name, inline) = match long.split_once('=') {
                    Some((name, value)) => (name, Some(value.to_string())),
                    None => (long, None),
                };

                match name {
                    "help" => args.help = true,
                    "version" => args.version = true,
                    "compress" => args.compress = true,
                    "raw" => args.format = Some(StreamFormat::Raw),
                    "zlib" => args.format = Some(StreamFormat::Zlib),
                    "items" => args.items = true,
                    "hex" => args.hex = true,
                    "json" => args.json = true,
                    "quiet" | "silent" => {
                        args.quiet = true;
                        args.verbosity = 0;
                    }
                    "verbose" => args.verbosity = args.verbosity.max(1).saturating_add(1),
                    "best" => args.compression_level = 9,
                    "fast" => args.compression_level = 1,
                    "level" | "text" | "select" => {
                        let value = match inline {
                            Some(value) => value,
                            None => {
                                // Value is the next argument
                                if i + 1 >= argv.len() {
                                    return Err(LensError::invalid_argument(format!(
                                        "--{} requires an argument",
                                        name
                                    )));
                                }
                                i += 1;
                                argv[i].clone()
                            }
                        };

                        match name {
                            "level" => args.compression_level = parse_level(&value)?,
                            "text" => args.text = Some(value),
                            _ => args.select = Some(parse_select(&value)?),
                        }
                    }
                    _ => {
                        return Err(LensError::invalid_argument(format!(
                            "Unknown option: {}",
                            arg
                        )))
                    }
                }
            } else {
                // Parse short options
                let chars: Vec<char> = arg.chars().collect();
                let mut j = 1; // Skip the initial '-'

                while j < chars.len() {
                    match chars[j] {
                        'h' => args.help = true,
                        'V' => args.version = true,
                        'c' => args.compress = true,
                        'r' => args.format = Some(StreamFormat::Raw),
                        'z' => args.format = Some(StreamFormat::Zlib),
                        'i' => args.items = true,
                        'x' => args.hex = true,
                        'j' => args.json = true,
                        'q' => {
                            args.quiet = true;
                            args.verbosity = 0;
                        }
                        'v' => args.verbosity = args.verbosity.max(1).saturating_add(1),
                        '0'..='9' => {
                            args.compression_level = chars[j] as u8 - b'0';
                        }
                        's' => {
                            let value = if j + 1 < chars.len() {
                                // Value is attached to the option
                                let value_str: String = chars[j + 1..].iter().collect();
                                j = chars.len();
                                value_str
                            } else {
                                if i + 1 >= argv.len() {
                                    return Err(LensError::invalid_argument(
                                        "-s requires an argument",
                                    ));
                                }
                                i += 1;
                                argv[i].clone()
                            };
                            args.select = Some(parse_select(&value)?);
                        }
                        _ => {
                            return Err(LensError::invalid_argument(format!(
                                "Unknown option: -{}",
                                chars[j]
                            )))
                        }
                    }
                    j += 1;
                }
            }

            i += 1;
        }

        if args.compression_level > 9 {
            return Err(LensError::InvalidLevel(args.compression_level));
        }

        if args.text.is_some() && !args.files.is_empty() {
            return Err(LensError::invalid_argument(
                "--text cannot be combined with input files",
            ));
        }

        Ok(args)
    }

    /// Whether the inputs need compressing before they are traced
    pub fn needs_compression(&self) -> bool {
        self.compress || self.text.is_some()
    }
}

fn parse_env_args(env_str: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current_arg = String::new();
    let mut in_quotes = false;

    for ch in env_str.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current_arg.is_empty() {
                    args.push(std::mem::take(&mut current_arg));
                }
            }
            _ => current_arg.push(ch),
        }
    }

    if !current_arg.is_empty() {
        args.push(current_arg);
    }

    args
}

fn parse_level(value: &str) -> LensResult<u8> {
    let level: u8 = value
        .parse()
        .map_err(|_| LensError::invalid_argument(format!("Invalid level: {}", value)))?;
    if level > 9 {
        return Err(LensError::InvalidLevel(level));
    }
    Ok(level)
}

/// Parse `BLOCK:ITEM`
fn parse_select(value: &str) -> LensResult<(usize, usize)> {
    let invalid = || LensError::invalid_argument(format!("Invalid selection: {}", value));
    let (block, item) = value.split_once(':').ok_or_else(invalid)?;
    let block = block.trim().parse().map_err(|_| invalid())?;
    let item = item.trim().parse().map_err(|_| invalid())?;
    Ok((block, item))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> LensResult<LensArgs> {
        LensArgs::parse_from(args.iter().map(|s| s.to_string()).collect(), None)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args, LensArgs::default());
        assert_eq!(args.compression_level, 6);
        assert!(!args.needs_compression());
    }

    #[test]
    fn test_combined_short_options() {
        let args = parse(&["-cix9", "data.txt"]).unwrap();
        assert!(args.compress && args.items && args.hex);
        assert_eq!(args.compression_level, 9);
        assert_eq!(args.files, vec!["data.txt"]);
    }

    #[test]
    fn test_long_options_with_values() {
        let args = parse(&["--text=hello", "--level", "3", "--select=1:4"]).unwrap();
        assert_eq!(args.text.as_deref(), Some("hello"));
        assert_eq!(args.compression_level, 3);
        assert_eq!(args.select, Some((1, 4)));
        assert!(args.needs_compression());
    }

    #[test]
    fn test_select_short_forms() {
        assert_eq!(parse(&["-s2:0"]).unwrap().select, Some((2, 0)));
        assert_eq!(parse(&["-xs", "1:7"]).unwrap().select, Some((1, 7)));
        assert!(parse(&["-s", "nope"]).is_err());
        assert!(parse(&["-s"]).is_err());
    }

    #[test]
    fn test_stdin_and_double_dash() {
        let args = parse(&["-", "--", "-r"]).unwrap();
        assert_eq!(args.files, vec!["-", "-r"]);
        assert_eq!(args.format, None);
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["-q"]).unwrap().verbosity, 0);
        assert_eq!(parse(&["-vv"]).unwrap().verbosity, 3);
        let many = format!("-{}", "v".repeat(300));
        assert_eq!(parse(&[many.as_str()]).unwrap().verbosity, u8::MAX);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            parse(&["--level=12"]),
            Err(LensError::InvalidLevel(12))
        ));
        assert!(matches!(
            parse(&["--bogus"]),
            Err(LensError::InvalidArgument(_))
        ));
        assert!(matches!(parse(&["-Q"]), Err(LensError::InvalidArgument(_))));
        assert!(parse(&["--text=a", "file"]).is_err());
    }

    #[test]
    fn test_env_options_come_first() {
        let args = LensArgs::parse_from(
            vec!["-3".to_string(), "in.zz".to_string()],
            Some("-i --level=8 \"--text=two words\""),
        );
        // --text from the environment conflicts with the file argument
        assert!(args.is_err());

        let args =
            LensArgs::parse_from(vec!["-3".to_string()], Some("-i --level=8")).unwrap();
        assert!(args.items);
        assert_eq!(args.compression_level, 3);
    }

    #[test]
    fn test_parse_env_args_quotes() {
        assert_eq!(
            parse_env_args("-x  \"--text=a b\"\t-j"),
            vec!["-x", "--text=a b", "-j"]
        );
    }
}
