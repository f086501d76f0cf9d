//! Query pools

use std::sync::Arc;
use crate::driver::{NativeEnum, NativeHandle, Release, SharedDriver};
use crate::error::Result;
use crate::state_tables;
use super::next_uid;

/// What a query measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Number of samples passing depth/stencil
    Occlusion,
    /// Whether any sample passed
    BinaryOcclusion,
    PrimitivesGenerated,
    TransformFeedbackPrimitivesWritten,
    /// GPU time between begin and end, in nanoseconds
    TimeElapsed,
    /// GPU timestamp, written with `write_timestamp`
    Timestamp,
}

/// Fixed-size array of native queries of one type
pub struct QueryPool {
    uid: u64,
    query_type: QueryType,
    target: NativeEnum,
    queries: Vec<NativeHandle>,
    driver: Arc<SharedDriver>,
}

impl QueryPool {
    pub(crate) fn create(driver: &Arc<SharedDriver>, query_type: QueryType, count: u32) -> Result<Self> {
        let target = state_tables::query_target(query_type);
        let mut gl = driver.lock();
        let mut queries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let query = gl.create_query(target);
            if query == 0 {
                for q in queries {
                    gl.delete_query(q);
                }
                crate::rhi_bail!("hearth::QueryPool", "Driver refused to create a {:?} query", query_type);
            }
            queries.push(query);
        }
        drop(gl);

        Ok(Self {
            uid: next_uid(),
            query_type,
            target,
            queries,
            driver: Arc::clone(driver),
        })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    pub fn len(&self) -> u32 {
        self.queries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub(crate) fn target(&self) -> NativeEnum {
        self.target
    }

    pub(crate) fn query(&self, index: u32) -> NativeHandle {
        debug_assert!((index as usize) < self.queries.len(), "query index {} out of range", index);
        self.queries[index as usize]
    }
}

impl Drop for QueryPool {
    fn drop(&mut self) {
        for &query in &self.queries {
            self.driver.release(Release::Query(query));
        }
    }
}
