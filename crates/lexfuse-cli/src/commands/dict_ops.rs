use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use lexfuse_core::dict::{
    BinaryDictionary, DictError, DictKind, DictionaryBuilder, DictionaryHeader,
    ExpandableDictionary, UserDictionary,
};
use lexfuse_core::user_history::UserHistoryDictionary;
use lexfuse_core::Locale;

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Dict(#[from] DictError),
    #[error("unrecognized file (magic {0:?})")]
    UnknownFormat(String),
}

/// What `info` found in a file, detected by its magic bytes.
#[derive(Debug)]
pub enum FileInfo {
    Dictionary {
        header: DictionaryHeader,
        words: usize,
    },
    UserDictionary {
        words: usize,
    },
    UserHistory {
        words: usize,
    },
}

pub fn inspect(path: &Path) -> Result<FileInfo, InspectError> {
    let mut magic = [0u8; 4];
    File::open(path)?.read_exact(&mut magic)?;
    match &magic {
        b"LFDX" => {
            let dict = BinaryDictionary::open_file(path, DictKind::Main)?;
            Ok(FileInfo::Dictionary {
                header: dict.header().clone(),
                words: dict.word_count(),
            })
        }
        b"LFUW" => {
            let dict = UserDictionary::open(path, None)?;
            Ok(FileInfo::UserDictionary {
                words: dict.dump_words().len(),
            })
        }
        b"LFUH" => {
            let dict = UserHistoryDictionary::open(path, None, None)?;
            Ok(FileInfo::UserHistory {
                words: dict.snapshot().len(),
            })
        }
        other => Err(InspectError::UnknownFormat(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// Build a dictionary file from a tab-separated word list.
pub fn compile_word_list(
    text: &str,
    locale: &Locale,
    version: u32,
    output: &Path,
) -> Result<usize, DictError> {
    let mut builder = DictionaryBuilder::new(locale, version);
    builder.add_word_list(text)?;
    builder.write(output)?;
    Ok(builder.word_count())
}

pub fn compile(word_list: &str, output_file: &str, locale: &str, version: u32) {
    let text = die!(
        fs::read_to_string(word_list),
        "Error reading {word_list}: {}"
    );
    let locale = Locale::parse(locale);
    eprintln!("Locale: {locale}, version {version}");
    let words = die!(
        compile_word_list(&text, &locale, version, Path::new(output_file)),
        "Error compiling dictionary: {}"
    );
    let file_size = fs::metadata(output_file).map(|m| m.len()).unwrap_or(0);
    eprintln!(
        "Wrote {output_file}: {words} words ({:.1} KB)",
        file_size as f64 / 1024.0
    );
}

pub fn info(file: &str) {
    let found = die!(inspect(Path::new(file)), "Error reading {file}: {}");
    let file_size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);
    match found {
        FileInfo::Dictionary { header, words } => {
            println!("Dictionary: {file}");
            for (key, value) in header.attributes() {
                println!("  {key} = {value}");
            }
            println!("  words: {words}");
        }
        FileInfo::UserDictionary { words } => {
            println!("User dictionary: {file}");
            println!("  words: {words}");
        }
        FileInfo::UserHistory { words } => {
            println!("User history checkpoint: {file}");
            println!("  words: {words}");
        }
    }
    println!("  size: {file_size} bytes");
}
