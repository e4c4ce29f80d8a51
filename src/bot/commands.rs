//! Parseo de comandos de chat con prefijo (`!play <consulta>`, `!skip`...).

/// Comando de chat reconocido
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Skip,
    Stop,
    Pause,
    Resume,
    Previous,
    Queue,
    Loop,
    Shuffle,
    NowPlaying,
    Help,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play(_) => "play",
            Command::Skip => "skip",
            Command::Stop => "stop",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Previous => "previous",
            Command::Queue => "queue",
            Command::Loop => "loop",
            Command::Shuffle => "shuffle",
            Command::NowPlaying => "nowplaying",
            Command::Help => "help",
        }
    }
}

/// Separa `content` en comando y argumento.
///
/// Devuelve `None` si el mensaje no empieza con el prefijo o el comando no
/// existe. El nombre del comando no distingue mayúsculas; el argumento se
/// conserva tal cual, sin espacios a los lados.
pub fn parse(content: &str, prefix: &str) -> Option<Command> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "play" | "p" => Command::Play(args.to_string()),
        "skip" => Command::Skip,
        "stop" => Command::Stop,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "previous" | "prev" => Command::Previous,
        "queue" | "q" => Command::Queue,
        "loop" => Command::Loop,
        "shuffle" => Command::Shuffle,
        "nowplaying" | "np" => Command::NowPlaying,
        "help" => Command::Help,
        _ => return None,
    };

    Some(command)
}
