use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use rodio::source::{Buffered, Source};
use rodio::{Decoder, OutputStream, Sink};

/// Plays named sounds. The line only ever needs to start a sound (once or
/// looped) and to cut everything off.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, name: &str, looping: bool);
    fn stop_all(&self);
}

enum SoundCmd {
    Play { name: String, looping: bool },
    StopAll
}

/// Sound bank backed by a dedicated playback thread.
///
/// The thread owns the audio output stream and the decoded sources; callers
/// on any thread command it over a channel, so `play`/`stop_all` never
/// block beyond a channel send.
pub struct SoundBank {
    tx: mpsc::Sender<SoundCmd>
}

struct Sound {
    src: Buffered<rodio::source::SamplesConverter<Decoder<BufReader<File>>, i16>>
}

impl Sound {
    fn from_file(path: &Path) -> Self {
        let file = File::open(path).expect("Unable to open sound file");
        let src = Decoder::new(BufReader::new(file))
            .expect("Unable to decode sound file")
            .convert_samples::<i16>();

        Self {
            src: src.buffered()
        }
    }
}

impl SoundBank {
    pub fn spawn(root_path: impl Into<PathBuf>) -> Self {
        let root = root_path.into();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || run_playback(&root, rx));
        Self { tx }
    }
}

impl SoundPlayer for SoundBank {
    fn play(&self, name: &str, looping: bool) {
        self.tx.send(SoundCmd::Play { name: name.to_owned(), looping }).ok();
    }

    fn stop_all(&self) {
        self.tx.send(SoundCmd::StopAll).ok();
    }
}

fn load_sounds(root: &Path) -> IndexMap<String, Sound> {
    let mut sounds = IndexMap::new();
    for pattern in ["**/*.wav", "**/*.ogg"] {
        let search_path = root.join(pattern);
        let search_str = match search_path.to_str() {
            Some(s) => s,
            None => continue
        };
        let entries = match glob::glob(search_str) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Bad sound search pattern '{}': {}", search_str, err);
                continue
            }
        };
        for path in entries.flatten() {
            let sound_key = path.strip_prefix(root).unwrap_or(&path)
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            debug!("Loaded sound '{}' from {}", sound_key, path.display());
            sounds.insert(sound_key, Sound::from_file(&path));
        }
    }
    info!("Loaded {} sound(s).", sounds.len());
    sounds
}

fn run_playback(root: &Path, rx: mpsc::Receiver<SoundCmd>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(err) => {
            error!("No audio output device available: {}", err);
            return
        }
    };
    let sounds = load_sounds(root);
    let mut active: HashMap<String, Sink> = HashMap::new();

    while let Ok(cmd) = rx.recv() {
        match cmd {
            SoundCmd::Play { name, looping } => {
                let sound = match sounds.get(&name) {
                    Some(sound) => sound,
                    None => {
                        warn!("Tried to play nonexistent sound '{}'", name);
                        continue
                    }
                };
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(err) => {
                        error!("Unable to open playback sink: {}", err);
                        continue
                    }
                };
                if looping {
                    sink.append(sound.src.clone().repeat_infinite());
                } else {
                    sink.append(sound.src.clone());
                }
                info!("Playing sound: {} {}", name, if looping { "in loop" } else { "once" });
                // Restarting a sound cuts off its previous playback.
                if let Some(old) = active.insert(name, sink) {
                    old.stop();
                }
            },
            SoundCmd::StopAll => {
                for (_, sink) in active.drain() {
                    sink.stop();
                }
                info!("Stopped all sounds");
            }
        }
    }
}
