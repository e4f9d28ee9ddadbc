//! Static table of supported linters: executable, argv shape, applicable
//! extensions, timeouts, and which output parser family applies.

use crate::parsers::ParserKind;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Configuration for a single linter, as stored in the registry.
#[derive(Debug, Clone)]
pub struct LinterConfig {
    /// Executable name looked up on `PATH`.
    pub executable: &'static str,
    /// Arguments always passed before option-derived flags.
    pub base_args: &'static [&'static str],
    /// Environment variables always set for the subprocess.
    pub env_additions: &'static [(&'static str, &'static str)],
    /// File extensions (without leading dot) this linter applies to.
    pub extensions: &'static [&'static str],
    /// Default subprocess timeout, in milliseconds.
    pub default_timeout_ms: u64,
    /// Flag to append when `options.fix` is requested, if supported.
    pub fix_flag: Option<&'static str>,
    /// Flag template for `options.config_file`; `{}` is replaced with the path.
    pub config_flag: Option<&'static str>,
    /// Environment variable name to carry `options.log_level`, if any.
    pub log_level_env: Option<&'static str>,
    /// Highest exit code still considered a successful run (not a crash).
    /// Most linters return 1 when issues are found; this is the default.
    pub max_ok_exit_code: i32,
    /// Parser applied when output looks like JSON (`{` or `[` prefix).
    pub json_parser: Option<ParserKind>,
    /// Parser applied when the JSON parser is absent or doesn't apply.
    pub text_parser: Option<ParserKind>,
}

impl LinterConfig {
    const fn new(executable: &'static str, extensions: &'static [&'static str]) -> Self {
        Self {
            executable,
            base_args: &[],
            env_additions: &[],
            extensions,
            default_timeout_ms: 30_000,
            fix_flag: None,
            config_flag: None,
            log_level_env: None,
            max_ok_exit_code: 1,
            json_parser: None,
            text_parser: None,
        }
    }

    const fn base_args(mut self, args: &'static [&'static str]) -> Self {
        self.base_args = args;
        self
    }

    const fn fix(mut self, flag: &'static str) -> Self {
        self.fix_flag = Some(flag);
        self
    }

    const fn config(mut self, flag: &'static str) -> Self {
        self.config_flag = Some(flag);
        self
    }

    const fn log_level_env(mut self, var: &'static str) -> Self {
        self.log_level_env = Some(var);
        self
    }

    const fn max_ok(mut self, code: i32) -> Self {
        self.max_ok_exit_code = code;
        self
    }

    const fn parsers(mut self, json: Option<ParserKind>, text: Option<ParserKind>) -> Self {
        self.json_parser = json;
        self.text_parser = text;
        self
    }
}

fn build_registry() -> HashMap<&'static str, LinterConfig> {
    use ParserKind::*;

    let entries: &[LinterConfig] = &[
        LinterConfig::new("eslint", &["js", "jsx", "ts", "tsx"])
            .base_args(&["--format", "json"])
            .fix("--fix")
            .config("--config")
            .max_ok(1)
            .parsers(Some(EslintLike), Some(Generic)),
        LinterConfig::new("prettier", &["js", "jsx", "ts", "tsx", "css", "scss", "html", "md"])
            .base_args(&["--check"])
            .fix("--write")
            .config("--config")
            .parsers(None, Some(Generic)),
        LinterConfig::new("jshint", &["js"]).parsers(None, Some(Generic)),
        LinterConfig::new("oxlint", &["js", "jsx", "ts", "tsx"])
            .base_args(&["--format", "json"])
            .fix("--fix")
            .parsers(Some(EslintLike), Some(Generic)),
        LinterConfig::new("biome", &["js", "jsx", "ts", "tsx", "json"])
            .base_args(&["check", "--reporter", "json"])
            .fix("--write")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("biome-lint", &["js", "jsx", "ts", "tsx"])
            .base_args(&["lint", "--reporter", "json"])
            .fix("--write")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("pylint", &["py"])
            .base_args(&["--output-format", "json"])
            .config("--rcfile")
            .max_ok(1)
            .parsers(Some(PylintLike), Some(Generic)),
        LinterConfig::new("flake8", &["py"])
            .config("--config")
            .parsers(None, Some(Generic)),
        LinterConfig::new("black", &["py"]).base_args(&["--check"]).fix("--"),
        LinterConfig::new("isort", &["py"]).base_args(&["--check-only"]).fix("--"),
        LinterConfig::new("bandit", &["py"])
            .base_args(&["-f", "json"])
            .config("-c")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("mypy", &["py"]).config("--config-file").parsers(None, Some(Generic)),
        LinterConfig::new("shellcheck", &["sh", "bash"])
            .base_args(&["--format", "json"])
            .parsers(Some(ShellcheckLike), Some(Generic)),
        LinterConfig::new("golangci-lint", &["go"])
            .base_args(&["run", "--out-format", "json"])
            .fix("--fix")
            .config("--config")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("gofmt", &["go"]).base_args(&["-l"]).fix("-w").max_ok(0),
        LinterConfig::new("goimports", &["go"]).base_args(&["-l"]).fix("-w").max_ok(0),
        LinterConfig::new("rubocop", &["rb"])
            .base_args(&["--format", "json"])
            .fix("--auto-correct")
            .config("--config")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("hadolint", &["dockerfile"])
            .base_args(&["--format", "json"])
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("yamllint", &["yaml", "yml"])
            .base_args(&["-f", "parsable"])
            .config("-c")
            .parsers(None, Some(Generic)),
        LinterConfig::new("jsonlint", &["json"]).parsers(None, Some(Generic)),
        LinterConfig::new("markdownlint", &["md", "markdown"])
            .base_args(&["--json"])
            .fix("--fix")
            .config("--config")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("stylelint", &["css", "scss"])
            .base_args(&["--formatter", "json"])
            .fix("--fix")
            .config("--config")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("htmlhint", &["html", "htm"])
            .base_args(&["--format", "json"])
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("cppcheck", &["c", "h", "cc", "cpp", "hpp"])
            .base_args(&["--enable=all"])
            .parsers(None, Some(Generic)),
        LinterConfig::new("checkstyle", &["java"]).base_args(&["-f", "xml"]).max_ok(0),
        LinterConfig::new("pmd", &["java"]).base_args(&["check", "-f", "json"]).parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("spotbugs", &["java"]).max_ok(1),
        LinterConfig::new("ktlint", &["kt"]).base_args(&["--reporter=json"]).fix("-F").parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("detekt", &["kt"]).config("--config").max_ok(1),
        LinterConfig::new("swiftlint", &["swift"])
            .base_args(&["lint", "--reporter", "json"])
            .fix("--fix")
            .config("--config")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("rustfmt", &["rs"]).base_args(&["--check"]).fix("--").max_ok(1),
        LinterConfig::new("clippy", &["rs"]).base_args(&["--message-format", "json"]).fix("--fix").parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("phpcs", &["php"])
            .base_args(&["--report=json"])
            .fix("--")
            .config("--standard")
            .parsers(Some(Generic), Some(Generic)),
        LinterConfig::new("phpstan", &["php"])
            .base_args(&["analyse", "--error-format", "json"])
            .config("--configuration")
            .parsers(Some(Generic), Some(Generic)),
    ];

    entries
        .iter()
        .map(|c| (c.executable, c.clone()))
        .collect()
}

fn registry() -> &'static HashMap<&'static str, LinterConfig> {
    static REGISTRY: OnceLock<HashMap<&'static str, LinterConfig>> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

/// Look up a linter's configuration by its identifier.
pub fn lookup(linter: &str) -> Option<LinterConfig> {
    registry().get(linter).cloned()
}

/// Sorted list of every registered linter identifier.
pub fn list() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = registry().keys().copied().collect();
    names.sort_unstable();
    names
}
