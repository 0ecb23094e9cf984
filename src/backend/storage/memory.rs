// src/backend/storage/memory.rs
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::DefaultMemoryImpl;
use std::cell::RefCell;

// One region per stable structure. Ids are persisted; never renumber.
const CONFIG_MEM_ID: MemoryId = MemoryId::new(0);
const LIBRARY_STORE_MEM_ID: MemoryId = MemoryId::new(1);
const AUDIT_LOG_MEM_ID: MemoryId = MemoryId::new(2);
const METRICS_MEM_ID: MemoryId = MemoryId::new(3);

pub type Memory = VirtualMemory<DefaultMemoryImpl>;

thread_local! {
    static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> = RefCell::new(
        MemoryManager::init(DefaultMemoryImpl::default())
    );
}

/// Get memory instance for a specific MemoryId.
pub fn get_memory(id: MemoryId) -> Memory {
    MEMORY_MANAGER.with(|m| m.borrow().get(id))
}

pub fn get_config_memory() -> Memory {
    get_memory(CONFIG_MEM_ID)
}

/// Region backing the bounded key-value store that holds the record set.
pub fn get_library_store_memory() -> Memory {
    get_memory(LIBRARY_STORE_MEM_ID)
}

pub fn get_audit_log_memory() -> Memory {
    get_memory(AUDIT_LOG_MEM_ID)
}

pub fn get_metrics_memory() -> Memory {
    get_memory(METRICS_MEM_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_stable_structures::Memory as _;

    #[test]
    fn regions_do_not_overlap() {
        let store = get_library_store_memory();
        store.grow(1);
        store.write(0, b"records");

        let audit = get_audit_log_memory();
        if audit.size() == 0 {
            audit.grow(1);
        }
        let mut buf = [0u8; 7];
        audit.read(0, &mut buf);
        assert_ne!(&buf, b"records");
    }
}
