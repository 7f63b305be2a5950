use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use richtext_core::{Format, MarkdownConverter};

use crate::config::Config;

pub const USAGE: &str = "\
Usage: richtext <command> [args] [--file PATH]

Input is read from --file, or from stdin when no file is given.

Commands:
  sanitize                       Sanitize HTML
  strip                          Strip HTML down to plain text
  to-html                        Convert Markdown to sanitized HTML
  to-markdown                    Convert HTML to Markdown
  check                          Report whether the input contains Markdown syntax
  url <url>                      Check a link URL
  image-src <src>                Check an image source
  format <fmt> <start> <end>     Toggle bold|italic|strikethrough|code on a selection
  link <pos> <text> <url>        Insert a Markdown link
  image <pos> <alt> <src>        Insert a Markdown image
  heading <line_start> <level>   Set the heading level of a line
  code-block <pos> [lang]        Insert an empty fenced code block
  config                         Print the effective configuration
  init-config                    Write a default configuration file
  help                           Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sanitize,
    Strip,
    ToHtml,
    ToMarkdown,
    Check,
    Url(String),
    ImageSrc(String),
    Format {
        format: Format,
        start: usize,
        end: usize,
    },
    Link {
        position: usize,
        text: String,
        url: String,
    },
    Image {
        position: usize,
        alt: String,
        src: String,
    },
    Heading {
        line_start: usize,
        level: u8,
    },
    CodeBlock {
        position: usize,
        language: Option<String>,
    },
    Config,
    InitConfig,
    Help,
}

impl Command {
    /// Whether the command operates on the document read from input.
    pub fn reads_input(&self) -> bool {
        !matches!(
            self,
            Command::Url(_)
                | Command::ImageSrc(_)
                | Command::Config
                | Command::InitConfig
                | Command::Help
        )
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub file: Option<PathBuf>,
}

impl Invocation {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut file = None;
        let mut parts = Vec::new();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--file" | "-f" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--file requires a path"))?;
                    file = Some(PathBuf::from(path));
                }
                "--help" | "-h" => parts.insert(0, "help".to_string()),
                _ => parts.push(arg),
            }
        }

        let Some((name, rest)) = parts.split_first() else {
            return Ok(Self {
                command: Command::Help,
                file,
            });
        };

        let command = match name.as_str() {
            "sanitize" => expect_args(rest, 0, Command::Sanitize)?,
            "strip" => expect_args(rest, 0, Command::Strip)?,
            "to-html" => expect_args(rest, 0, Command::ToHtml)?,
            "to-markdown" => expect_args(rest, 0, Command::ToMarkdown)?,
            "check" => expect_args(rest, 0, Command::Check)?,
            "config" => expect_args(rest, 0, Command::Config)?,
            "init-config" => expect_args(rest, 0, Command::InitConfig)?,
            "help" => Command::Help,
            "url" => {
                let [url] = take_args::<1>(name, rest)?;
                Command::Url(url)
            }
            "image-src" => {
                let [src] = take_args::<1>(name, rest)?;
                Command::ImageSrc(src)
            }
            "format" => {
                let [format, start, end] = take_args::<3>(name, rest)?;
                Command::Format {
                    format: format.parse()?,
                    start: parse_number(&start, "start")?,
                    end: parse_number(&end, "end")?,
                }
            }
            "link" => {
                let [position, text, url] = take_args::<3>(name, rest)?;
                Command::Link {
                    position: parse_number(&position, "position")?,
                    text,
                    url,
                }
            }
            "image" => {
                let [position, alt, src] = take_args::<3>(name, rest)?;
                Command::Image {
                    position: parse_number(&position, "position")?,
                    alt,
                    src,
                }
            }
            "heading" => {
                let [line_start, level] = take_args::<2>(name, rest)?;
                Command::Heading {
                    line_start: parse_number(&line_start, "line_start")?,
                    level: level
                        .parse()
                        .with_context(|| format!("invalid heading level: {}", level))?,
                }
            }
            "code-block" => match rest {
                [position] => Command::CodeBlock {
                    position: parse_number(position, "position")?,
                    language: None,
                },
                [position, language] => Command::CodeBlock {
                    position: parse_number(position, "position")?,
                    language: Some(language.clone()),
                },
                _ => return Err(anyhow::anyhow!("code-block expects <pos> [lang]")),
            },
            other => return Err(anyhow::anyhow!("unknown command: {}", other)),
        };

        Ok(Self { command, file })
    }
}

fn expect_args(rest: &[String], count: usize, command: Command) -> Result<Command> {
    if rest.len() != count {
        return Err(anyhow::anyhow!(
            "unexpected arguments: {}",
            rest[count.min(rest.len())..].join(" ")
        ));
    }
    Ok(command)
}

fn take_args<const N: usize>(name: &str, rest: &[String]) -> Result<[String; N]> {
    <[String; N]>::try_from(rest.to_vec()).map_err(|_| {
        anyhow::anyhow!("{} expects {} argument(s), got {}", name, N, rest.len())
    })
}

fn parse_number(value: &str, what: &str) -> Result<usize> {
    value
        .parse()
        .with_context(|| format!("invalid {}: {}", what, value))
}

pub struct CommandProcessor {
    config: Config,
    converter: MarkdownConverter,
    config_path: Option<PathBuf>,
}

impl CommandProcessor {
    pub fn new(config: Config) -> Result<Self> {
        let converter = config.build_converter()?;
        Ok(Self {
            config,
            converter,
            config_path: Config::config_path(),
        })
    }

    /// Overrides where `init-config` writes.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn converter(&self) -> &MarkdownConverter {
        &self.converter
    }

    pub async fn execute_command(&self, command: &Command, input: &str) -> Result<String> {
        let converter = &self.converter;

        let output = match command {
            Command::Sanitize => converter.sanitizer().sanitize(input),
            Command::Strip => converter.sanitizer().strip_tags(input),
            Command::ToHtml => converter.to_html(input),
            Command::ToMarkdown => converter.to_markdown(input),
            Command::Check => converter.has_markdown_syntax(input).to_string(),
            Command::Url(url) => to_json(&json!({
                "url": url,
                "safe": converter.sanitizer().is_url_safe(url),
                "sanitized": converter.sanitizer().sanitize_url(url),
            }))?,
            Command::ImageSrc(src) => to_json(&json!({
                "src": src,
                "sanitized": converter.sanitizer().sanitize_image_src(src),
            }))?,
            Command::Format { format, start, end } => {
                to_json(&converter.apply_format(input, *start, *end, *format))?
            }
            Command::Link {
                position,
                text,
                url,
            } => to_json(&converter.insert_link(input, *position, text, url))?,
            Command::Image { position, alt, src } => {
                to_json(&converter.insert_image(input, *position, alt, src))?
            }
            Command::Heading { line_start, level } => to_json(&json!({
                "text": converter.insert_heading(input, *line_start, *level),
            }))?,
            Command::CodeBlock { position, language } => {
                to_json(&converter.insert_code_block(input, *position, language.as_deref()))?
            }
            Command::Config => serde_json::to_string_pretty(&self.config)
                .context("failed to serialize config")?,
            Command::InitConfig => self.init_config().await?,
            Command::Help => USAGE.to_string(),
        };

        log::debug!("Executed {:?}", command);
        Ok(output)
    }

    async fn init_config(&self) -> Result<String> {
        let path = self
            .config_path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no configuration directory available"))?;
        if tokio::fs::try_exists(path).await? {
            return Err(anyhow::anyhow!(
                "configuration already exists: {}",
                path.display()
            ));
        }
        Config::default().save_to(path).await?;
        Ok(format!("Wrote default configuration to {}", path.display()))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to serialize result")
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_core::{MentionItem, Sanitizer};
    use tempfile::TempDir;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn processor() -> CommandProcessor {
        CommandProcessor::new(Config::default()).unwrap()
    }

    #[test]
    fn test_parse_simple_commands() {
        let invocation = Invocation::parse(args("to-html --file notes.md")).unwrap();
        assert_eq!(invocation.command, Command::ToHtml);
        assert_eq!(invocation.file, Some(PathBuf::from("notes.md")));

        let invocation = Invocation::parse(args("sanitize")).unwrap();
        assert_eq!(invocation.command, Command::Sanitize);
        assert!(invocation.file.is_none());

        assert_eq!(Invocation::parse(args("")).unwrap().command, Command::Help);
        assert_eq!(
            Invocation::parse(args("sanitize --help")).unwrap().command,
            Command::Help
        );
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            Invocation::parse(args("format bold 0 5")).unwrap().command,
            Command::Format {
                format: Format::Bold,
                start: 0,
                end: 5
            }
        );
        assert_eq!(
            Invocation::parse(args("code-block 3")).unwrap().command,
            Command::CodeBlock {
                position: 3,
                language: None
            }
        );
        assert_eq!(
            Invocation::parse(args("heading 0 2")).unwrap().command,
            Command::Heading {
                line_start: 0,
                level: 2
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Invocation::parse(args("explode")).is_err());
        assert!(Invocation::parse(args("url")).is_err());
        assert!(Invocation::parse(args("format bold x 5")).is_err());
        assert!(Invocation::parse(args("format underline 0 5")).is_err());
        assert!(Invocation::parse(args("sanitize extra")).is_err());
        assert!(Invocation::parse(args("to-html --file")).is_err());
    }

    #[test]
    fn test_reads_input() {
        assert!(Command::ToHtml.reads_input());
        assert!(!Command::Url("x".to_string()).reads_input());
        assert!(!Command::Help.reads_input());
    }

    #[tokio::test]
    async fn test_conversion_commands() {
        let cp = processor();

        let html = cp
            .execute_command(&Command::ToHtml, "# Hi\n\n**there**")
            .await
            .unwrap();
        assert_eq!(html, "<h1>Hi</h1>\n<p><strong>there</strong></p>");

        let markdown = cp.execute_command(&Command::ToMarkdown, &html).await.unwrap();
        assert_eq!(markdown, "# Hi\n\n**there**");

        let clean = cp
            .execute_command(&Command::Sanitize, "<p onclick=\"x()\">a</p><script>b</script>")
            .await
            .unwrap();
        assert_eq!(clean, "<p>a</p>");

        let text = cp
            .execute_command(&Command::Strip, "<p>a <b>b</b></p>")
            .await
            .unwrap();
        assert_eq!(text, "a b");

        let check = cp.execute_command(&Command::Check, "- item").await.unwrap();
        assert_eq!(check, "true");
    }

    #[tokio::test]
    async fn test_url_commands_print_json() {
        let cp = processor();

        let out = cp
            .execute_command(&Command::Url("javascript:alert(1)".to_string()), "")
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["safe"], false);
        assert!(value["sanitized"].is_null());

        let out = cp
            .execute_command(&Command::ImageSrc("/a.png".to_string()), "")
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["sanitized"], "/a.png");
    }

    #[tokio::test]
    async fn test_editing_commands_print_json() {
        let cp = processor();

        let out = cp
            .execute_command(
                &Command::Format {
                    format: Format::Bold,
                    start: 0,
                    end: 5,
                },
                "hello world",
            )
            .await
            .unwrap();
        assert_eq!(
            out,
            r#"{"text":"**hello** world","selectionStart":2,"selectionEnd":7}"#
        );

        let out = cp
            .execute_command(
                &Command::Heading {
                    line_start: 0,
                    level: 3,
                },
                "Title",
            )
            .await
            .unwrap();
        assert_eq!(out, r####"{"text":"### Title"}"####);

        let out = cp
            .execute_command(
                &Command::Link {
                    position: 0,
                    text: "x".to_string(),
                    url: "https://x.io".to_string(),
                },
                "",
            )
            .await
            .unwrap();
        assert_eq!(out, r#"{"text":"[x](https://x.io)","position":17}"#);
    }

    #[tokio::test]
    async fn test_config_drives_conversion() {
        let mut config = Config::default();
        config
            .mentions
            .mentions
            .push(MentionItem::new("alice", "Alice"));
        let cp = CommandProcessor::new(config).unwrap();

        let html = cp.execute_command(&Command::ToHtml, "@alice").await.unwrap();
        assert_eq!(
            html,
            r#"<p><span class="mention" data-mention="alice">@Alice</span></p>"#
        );
        assert_eq!(
            cp.converter().sanitizer().sanitize(&html),
            Sanitizer::default().sanitize(&html)
        );

        let printed = cp.execute_command(&Command::Config, "").await.unwrap();
        assert!(printed.contains("\"alice\""));
    }

    #[tokio::test]
    async fn test_init_config_writes_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let cp = processor().with_config_path(&path);

        let first = cp.execute_command(&Command::InitConfig, "").await;
        let second = cp.execute_command(&Command::InitConfig, "").await;

        assert!(first.unwrap().contains("config.json"));
        assert!(second.is_err());
        let saved = Config::load_from(&path).await.unwrap();
        assert_eq!(saved, Config::default());
    }
}
