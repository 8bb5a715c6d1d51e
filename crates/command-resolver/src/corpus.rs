//! Built-in training corpus

use crate::Intent;

/// Bumped whenever a phrase is added, removed or relabeled.
pub const TRAINING_CORPUS_VERSION: u32 = 1;

/// Canonical phrase → intent pairs, in training order.
pub const TRAINING_CORPUS: &[(&str, Intent)] = &[
    ("nyalakan lampu", Intent::LightOn),
    ("hidupin lampunya", Intent::LightOn),
    ("tolong nyalakan", Intent::LightOn),
    ("lampu hidup", Intent::LightOn),
    ("terangin dong", Intent::LightOn),
    ("on lampu", Intent::LightOn),
    ("aktifkan cahaya", Intent::LightOn),

    ("matikan lampu", Intent::LightOff),
    ("lampu mati", Intent::LightOff),
    ("padamkan", Intent::LightOff),
    ("off lampunya", Intent::LightOff),
    ("matiin deh", Intent::LightOff),
    ("gelapin", Intent::LightOff),

    ("maju", Intent::MoveForward),
    ("jalan kedepan", Intent::MoveForward),
    ("maju robot", Intent::MoveForward),
    ("kedepan", Intent::MoveForward),
    ("forward", Intent::MoveForward),
    ("maju pelan", Intent::MoveForward),
    ("majuin dong", Intent::MoveForward),

    ("mundur", Intent::MoveBackward),
    ("kebelakang", Intent::MoveBackward),
    ("mundur robot", Intent::MoveBackward),
    ("back", Intent::MoveBackward),
    ("mundurin", Intent::MoveBackward),

    ("kiri", Intent::MoveLeft),
    ("belok kiri", Intent::MoveLeft),
    ("ke kiri", Intent::MoveLeft),
    ("turn left", Intent::MoveLeft),
    ("belok ke kiri", Intent::MoveLeft),

    ("kanan", Intent::MoveRight),
    ("belok kanan", Intent::MoveRight),
    ("ke kanan", Intent::MoveRight),
    ("turn right", Intent::MoveRight),
    ("belok ke kanan", Intent::MoveRight),

    ("berhenti", Intent::Stop),
    ("stop", Intent::Stop),
    ("diam", Intent::Stop),
    ("berhenti robot", Intent::Stop),
    ("jangan jalan", Intent::Stop),
    ("semuanya diammm", Intent::Stop),

    ("suhu", Intent::ReadTemperature),
    ("cek suhu", Intent::ReadTemperature),
    ("berapa suhu", Intent::ReadTemperature),
    ("temperature", Intent::ReadTemperature),
    ("panas berapa", Intent::ReadTemperature),

    ("kelembaban", Intent::ReadHumidity),
    ("cek kelembaban", Intent::ReadHumidity),
    ("berapa kelembapan", Intent::ReadHumidity),
    ("humidity", Intent::ReadHumidity),
    ("lembab berapa", Intent::ReadHumidity),

    ("alarm", Intent::Alarm),
    ("bunyi alarm", Intent::Alarm),
    ("aktifkan alarm", Intent::Alarm),
    ("sirine", Intent::Alarm),

    ("bunyi", Intent::Beep),
    ("beep", Intent::Beep),
    ("bel", Intent::Beep),
    ("bunyiin", Intent::Beep),
];

/// The built-in corpus as owned pairs, ready for [`crate::TextClassifier::train`].
pub fn training_corpus() -> Vec<(String, Intent)> {
    TRAINING_CORPUS
        .iter()
        .map(|(text, intent)| (text.to_string(), *intent))
        .collect()
}
