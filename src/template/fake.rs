//! Random filler text for message bodies and headers.
//!
//! Exposed to templates as `fake`:
//!
//! ```jinja
//! subject: "{{ fake.sentence(5) }}"
//! body: |
//!   {{ fake.paragraph() }}
//!   {{ fake.unicode(200) }}
//! ```

use std::sync::{Arc, Mutex};

use minijinja::value::{from_args, Object, Value};
use minijinja::{Error, ErrorKind, State};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in",
    "reprehenderit", "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur",
    "excepteur", "sint", "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui",
    "officia", "deserunt", "mollit", "anim", "id", "est", "laborum",
];

const DOMAINS: &[&str] = &["example.com", "example.net", "example.org"];

/// Printable code point ranges used by [`Fake::unicode`].
const UNICODE_BLOCKS: &[(u32, u32)] = &[
    (0x0021, 0x007E), // ASCII
    (0x00C0, 0x00FF), // Latin-1 letters
    (0x0100, 0x017F), // Latin Extended-A
    (0x0391, 0x03A1), // Greek capitals
    (0x03B1, 0x03C9), // Greek small
    (0x0410, 0x044F), // Cyrillic
    (0x3041, 0x3096), // Hiragana
    (0x4E00, 0x9FFF), // CJK Unified Ideographs
];

/// Seedable generator of fake text.
#[derive(Debug)]
pub struct Fake {
    rng: Mutex<ChaCha8Rng>,
}

impl Fake {
    /// A generator seeded with `seed`, or from OS entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// Exactly `len` printable ASCII characters.
    pub fn ascii(&self, len: usize) -> String {
        self.with_rng(|rng| (0..len).map(|_| char::from(rng.gen_range(0x20u8..=0x7E))).collect())
    }

    /// Exactly `len` characters drawn from several scripts.
    pub fn unicode(&self, len: usize) -> String {
        self.with_rng(|rng| {
            (0..len)
                .map(|_| {
                    let (start, end) = UNICODE_BLOCKS[rng.gen_range(0..UNICODE_BLOCKS.len())];
                    char::from_u32(rng.gen_range(start..=end)).unwrap_or('?')
                })
                .collect()
        })
    }

    /// `len` random bytes.
    pub fn bytes(&self, len: usize) -> Vec<u8> {
        self.with_rng(|rng| (0..len).map(|_| rng.gen()).collect())
    }

    pub fn word(&self) -> String {
        self.with_rng(|rng| pick_word(rng).to_string())
    }

    /// A capitalized sentence of `words` words ending in a period.
    pub fn sentence(&self, words: usize) -> String {
        self.with_rng(|rng| make_sentence(rng, words))
    }

    /// `sentences` sentences of 4 to 12 words each.
    pub fn paragraph(&self, sentences: usize) -> String {
        self.with_rng(|rng| {
            (0..sentences)
                .map(|_| {
                    let words = rng.gen_range(4..=12);
                    make_sentence(rng, words)
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    pub fn email(&self) -> String {
        self.with_rng(|rng| {
            let first = pick_word(rng);
            let second = pick_word(rng);
            let number: u16 = rng.gen_range(1..1000);
            let domain = DOMAINS.choose(rng).copied().unwrap_or("example.com");
            format!("{first}.{second}{number}@{domain}")
        })
    }
}

fn pick_word(rng: &mut ChaCha8Rng) -> &'static str {
    WORDS.choose(rng).copied().unwrap_or("lorem")
}

fn make_sentence(rng: &mut ChaCha8Rng, words: usize) -> String {
    let mut sentence = (0..words.max(1))
        .map(|_| pick_word(rng))
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(first) = sentence.get(..1) {
        let upper = first.to_uppercase();
        sentence.replace_range(..1, &upper);
    }
    sentence.push('.');
    sentence
}

impl Object for Fake {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "ascii" => {
                let (len,): (usize,) = from_args(args)?;
                Ok(Value::from(self.ascii(len)))
            }
            "unicode" => {
                let (len,): (usize,) = from_args(args)?;
                Ok(Value::from(self.unicode(len)))
            }
            "bytes" => {
                let (len,): (usize,) = from_args(args)?;
                Ok(Value::from_bytes(self.bytes(len)))
            }
            "word" => {
                from_args::<()>(args)?;
                Ok(Value::from(self.word()))
            }
            "sentence" => {
                let (words,): (Option<usize>,) = from_args(args)?;
                Ok(Value::from(self.sentence(words.unwrap_or(8))))
            }
            "paragraph" => {
                let (sentences,): (Option<usize>,) = from_args(args)?;
                Ok(Value::from(self.paragraph(sentences.unwrap_or(4))))
            }
            "email" => {
                from_args::<()>(args)?;
                Ok(Value::from(self.email()))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("fake has no method named '{method}'"),
            )),
        }
    }
}
