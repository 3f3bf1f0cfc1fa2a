mod chunk_finder;
mod script_patterns;
pub mod audio_probe;
pub mod channel_detector;
pub mod chunk_generator;
pub mod config;
pub mod dialogue_extractor;
pub mod instruction_reader;
pub mod script_merger;
pub mod types;

pub use audio_probe::{AudioProbe, OggDurationProbe};
pub use channel_detector::detect_bgm_channel;
pub use chunk_finder::Ps3ChunkFinder;
pub use chunk_generator::generate_chunk_instruction;
pub use config::MergerConfig;
pub use dialogue_extractor::{extract_dialogues, extract_dialogues_from_file};
pub use instruction_reader::Ps3InstructionReader;
pub use script_merger::{
    FALLBACK_BGM_CHANNEL, merge_script, merge_script_file, merge_with_channel, render_script,
};
pub use types::{
    DialogueInstruction, Instruction, InstructionKind, LineEnding, MergeError, Ps3InstructionType,
};
