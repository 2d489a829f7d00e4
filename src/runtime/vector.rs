use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::ptr;

/// Elements reserved by `vector_init`.
pub const INITIAL_CAPACITY: usize = 100;

/// Layout shared with generated code: `{ i32 size, i32 capacity, ptr data }`.
#[repr(C)]
#[derive(Debug)]
pub struct Vector {
    pub size: i32,
    pub capacity: i32,
    pub data: *mut *mut c_void,
}

impl Vector {
    /// Take the storage back as a `Vec` for mutation.
    ///
    /// # Safety
    /// The vector must have been initialised by [`opal_vector_init`].
    unsafe fn storage(&self) -> ManuallyDrop<Vec<*mut c_void>> {
        ManuallyDrop::new(Vec::from_raw_parts(self.data, self.size as usize, self.capacity as usize))
    }

    fn store(&mut self, storage: &mut Vec<*mut c_void>) {
        self.size = storage.len() as i32;
        self.capacity = storage.capacity() as i32;
        self.data = storage.as_mut_ptr();
    }
}

/// # Safety
/// `vector` must be null or point to writable `Vector` storage.
pub unsafe extern "C" fn opal_vector_init(vector: *mut Vector) {
    let Some(vector) = vector.as_mut() else { return };
    let mut storage = ManuallyDrop::new(Vec::with_capacity(INITIAL_CAPACITY));
    vector.store(&mut storage);
}

/// Append `element`, doubling the capacity when full.
///
/// # Safety
/// `vector` must be null or initialised by [`opal_vector_init`].
pub unsafe extern "C" fn opal_vector_append(vector: *mut Vector, element: *mut c_void) {
    let Some(vector) = vector.as_mut() else { return };
    let mut storage = vector.storage();
    if storage.len() == storage.capacity() {
        let extra = storage.capacity().max(1);
        storage.reserve_exact(extra);
    }
    storage.push(element);
    vector.store(&mut storage);
}

/// Element at `index`, or null when out of range.
///
/// # Safety
/// `vector` must be null or initialised by [`opal_vector_init`].
pub unsafe extern "C" fn opal_vector_get(vector: *const Vector, index: i32) -> *mut c_void {
    let Some(vector) = vector.as_ref() else { return ptr::null_mut() };
    if index < 0 || index >= vector.size {
        return ptr::null_mut();
    }
    *vector.data.add(index as usize)
}

/// # Safety
/// `vector` must be null or initialised by [`opal_vector_init`].
pub unsafe extern "C" fn opal_vector_size(vector: *const Vector) -> i32 {
    vector.as_ref().map_or(0, |v| v.size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> Vector {
        Vector { size: 0, capacity: 0, data: ptr::null_mut() }
    }

    #[test]
    fn starts_empty_with_reserved_capacity() {
        let mut v = empty();
        unsafe { opal_vector_init(&mut v) };
        assert_eq!(unsafe { opal_vector_size(&v) }, 0);
        assert!(v.capacity as usize >= INITIAL_CAPACITY);
    }

    #[test]
    fn appends_and_reads_back() {
        let mut v = empty();
        unsafe {
            opal_vector_init(&mut v);
            for i in 1..=3usize {
                opal_vector_append(&mut v, (i * 2) as *mut c_void);
            }
            assert_eq!(opal_vector_size(&v), 3);
            assert_eq!(opal_vector_get(&v, 0) as usize, 2);
            assert_eq!(opal_vector_get(&v, 2) as usize, 6);
        }
    }

    #[test]
    fn out_of_range_reads_are_null() {
        let mut v = empty();
        unsafe {
            opal_vector_init(&mut v);
            opal_vector_append(&mut v, 1 as *mut c_void);
            assert!(opal_vector_get(&v, 1).is_null());
            assert!(opal_vector_get(&v, -1).is_null());
        }
    }

    #[test]
    fn doubles_capacity_when_full() {
        let mut v = empty();
        unsafe {
            opal_vector_init(&mut v);
            let initial = v.capacity;
            for i in 0..initial {
                opal_vector_append(&mut v, i as usize as *mut c_void);
            }
            assert_eq!(v.capacity, initial);
            opal_vector_append(&mut v, ptr::null_mut());
            assert!(v.capacity >= initial * 2);
            assert_eq!(opal_vector_size(&v), initial + 1);
            assert_eq!(opal_vector_get(&v, initial - 1) as usize, (initial - 1) as usize);
        }
    }
}
