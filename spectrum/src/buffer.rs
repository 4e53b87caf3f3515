use serde::{Deserialize, Serialize};
use crate::error::SpectrumError;

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum BufferStrategy {
    /// keep every trace
    Accumulate,
    /// keep the latest n traces
    RollingWindow(usize),
}

/// Per-trace results in the order the strategy keeps them.
#[derive(Clone,Debug,PartialEq)]
pub struct TraceBuffer<T> {
    strategy:BufferStrategy,
    entries:Vec<T>,
    last_updated:Option<usize>,
}

impl<T> TraceBuffer<T> {
    pub fn new(strategy:BufferStrategy) -> Result<Self,SpectrumError> {
        if strategy == BufferStrategy::RollingWindow(0) {
            return Err(SpectrumError::ZeroWindow);
        }
        Ok(Self{strategy,entries:vec![],last_updated:None})
    }

    pub fn push(&mut self,entry:T) {
        match self.strategy {
            BufferStrategy::RollingWindow(size) if self.entries.len() >= size => {
                let index = match self.last_updated {
                    Some(i) if i + 1 < self.entries.len() => i + 1,
                    _=> 0
                };
                self.entries[index] = entry;
                self.last_updated = Some(index);
            }
            _=> self.entries.push(entry)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn strategy(&self) -> BufferStrategy {
        self.strategy
    }
}
