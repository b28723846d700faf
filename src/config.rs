use std::path::PathBuf;

use crate::error::{Error, Result};

pub const USAGE: &str = "\
Usage: image-store [OPTIONS]

Options:
  --input PATH    image to convert (default: imgs/Windmill_NOAA.png)
  --output PATH   PNG to write (default: imgs/out.png)
  --title TEXT    window title (default: image store)
  --size WxH      initial window size (default: 1280x720)
  --windowed      do not maximize the window
  --no-preview    only clear the window instead of drawing the result
  --help          print this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub maximized: bool,
    pub preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("imgs/Windmill_NOAA.png"),
            output: PathBuf::from("imgs/out.png"),
            title: "image store".to_string(),
            width: 1280,
            height: 720,
            maximized: true,
            preview: true,
        }
    }
}

impl Config {
    /// Parses command-line flags. `args` excludes the program name.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--input" => config.input = PathBuf::from(value(&mut args, &arg)?),
                "--output" => config.output = PathBuf::from(value(&mut args, &arg)?),
                "--title" => config.title = value(&mut args, &arg)?,
                "--size" => {
                    let (width, height) = parse_size(&value(&mut args, &arg)?)?;
                    config.width = width;
                    config.height = height;
                }
                "--windowed" => config.maximized = false,
                "--no-preview" => config.preview = false,
                "--help" | "-h" => return Err(Error::Help(USAGE.to_string())),
                other => {
                    return Err(Error::Usage(format!(
                        "unknown argument '{other}'\n\n{USAGE}"
                    )));
                }
            }
        }

        Ok(config)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .filter(|value| !value.starts_with("--"))
        .ok_or_else(|| Error::Usage(format!("{flag} requires a value\n\n{USAGE}")))
}

fn parse_size(text: &str) -> Result<(u32, u32)> {
    let invalid = || Error::Usage(format!("invalid size '{text}', expected WxH"));
    let (w, h) = text.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}
