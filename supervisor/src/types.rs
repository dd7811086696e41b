use uuid::Uuid;

pub type JobId = Uuid;
pub type Pid = u32;
pub type OutputLine = bytes::Bytes;
