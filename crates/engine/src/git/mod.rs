// Local repository side: git worker, history reader, commit synthesizer, publisher.

pub mod history;
pub mod publish;
pub mod synth;
pub mod worker;
