// Pure draft rules: data model, turn order, deadlines, presence gate, status
// lifecycle. Nothing in here touches the store or the clock.

pub mod deadline;
pub mod pick;
pub mod presence;
pub mod slot;
pub mod state;
pub mod status;
