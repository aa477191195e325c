use log::{debug, error, info, trace};
use std::io;

/// Valid x64 userspace pointers are in this range.
const MIN_VALID_PTR: usize = 0x10000;
const MAX_VALID_PTR: usize = 0x7FFF_FFFF_FFFF;

pub fn is_valid_ptr(addr: usize) -> bool {
    addr > MIN_VALID_PTR && addr < MAX_VALID_PTR
}

pub trait ProcessMemory {
    fn attach(&mut self, pid: u32) -> io::Result<()>;
    fn read_memory(&self, address: usize, size: usize) -> io::Result<Vec<u8>>;
    fn write_memory(&self, address: usize, data: &[u8]) -> io::Result<()>;
    fn detach(&mut self) -> io::Result<()>;
    fn is_attached(&self) -> bool;

    /// Load address of the game executable in the attached process.
    fn module_base(&self) -> io::Result<usize>;

    /// Read exactly `size` bytes; a short read is an error.
    fn read_exact(&self, address: usize, size: usize) -> io::Result<Vec<u8>> {
        let data = self.read_memory(address, size)?;
        if data.len() < size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read at 0x{:X}: {} of {} bytes", address, data.len(), size),
            ));
        }
        Ok(data)
    }

    fn read_u8(&self, address: usize) -> io::Result<u8> {
        Ok(self.read_exact(address, 1)?[0])
    }

    fn read_i16(&self, address: usize) -> io::Result<i16> {
        let data = self.read_exact(address, 2)?;
        Ok(i16::from_le_bytes([data[0], data[1]]))
    }

    fn read_u32(&self, address: usize) -> io::Result<u32> {
        let data = self.read_exact(address, 4)?;
        Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }

    fn read_u64(&self, address: usize) -> io::Result<u64> {
        let data = self.read_exact(address, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data[..8]);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a pointer, returning `None` for null or out-of-range values.
    fn read_ptr(&self, address: usize) -> io::Result<Option<usize>> {
        let ptr = self.read_u64(address)? as usize;
        Ok(is_valid_ptr(ptr).then_some(ptr))
    }
}

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use windows::Win32::Foundation::{CloseHandle, HANDLE, HMODULE};
    use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
    use windows::Win32::System::ProcessStatus::EnumProcessModules;
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ,
        PROCESS_VM_WRITE,
    };

    pub struct WindowsMemory {
        handle: Option<HANDLE>,
    }

    impl WindowsMemory {
        pub fn new() -> Self {
            Self { handle: None }
        }

        fn handle(&self) -> io::Result<HANDLE> {
            self.handle
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Not attached"))
        }
    }

    impl ProcessMemory for WindowsMemory {
        fn attach(&mut self, pid: u32) -> io::Result<()> {
            self.detach()?;
            info!("Opening process PID={} with VM read/write access", pid);
            let access =
                PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION | PROCESS_QUERY_INFORMATION;
            let handle = unsafe { OpenProcess(access, false, pid) }.map_err(|e| {
                error!("OpenProcess failed for PID={}: {}", pid, e);
                io::Error::new(io::ErrorKind::PermissionDenied, e.to_string())
            })?;
            info!("Successfully opened process PID={}, handle={:?}", pid, handle);
            self.handle = Some(handle);
            Ok(())
        }

        fn read_memory(&self, address: usize, size: usize) -> io::Result<Vec<u8>> {
            let handle = self.handle()?;
            let mut buffer = vec![0u8; size];
            let mut bytes_read = 0usize;
            trace!("ReadProcessMemory addr=0x{:X} size={}", address, size);
            unsafe {
                ReadProcessMemory(
                    handle,
                    address as *const _,
                    buffer.as_mut_ptr() as *mut _,
                    size,
                    Some(&mut bytes_read),
                )
            }
            .map_err(|e| {
                debug!("ReadProcessMemory failed at 0x{:X} (size={}): {}", address, size, e);
                io::Error::new(io::ErrorKind::Other, e.to_string())
            })?;
            buffer.truncate(bytes_read);
            Ok(buffer)
        }

        fn write_memory(&self, address: usize, data: &[u8]) -> io::Result<()> {
            let handle = self.handle()?;
            let mut bytes_written = 0usize;
            trace!("WriteProcessMemory addr=0x{:X} size={}", address, data.len());
            unsafe {
                WriteProcessMemory(
                    handle,
                    address as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                    Some(&mut bytes_written),
                )
            }
            .map_err(|e| {
                debug!("WriteProcessMemory failed at 0x{:X} (size={}): {}", address, data.len(), e);
                io::Error::new(io::ErrorKind::Other, e.to_string())
            })?;
            if bytes_written < data.len() {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write at 0x{:X}: {} of {} bytes", address, bytes_written, data.len()),
                ));
            }
            Ok(())
        }

        fn detach(&mut self) -> io::Result<()> {
            if let Some(handle) = self.handle.take() {
                info!("Closing process handle {:?}", handle);
                unsafe { CloseHandle(handle) }
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            }
            Ok(())
        }

        fn is_attached(&self) -> bool {
            self.handle.is_some()
        }

        fn module_base(&self) -> io::Result<usize> {
            let handle = self.handle()?;
            let mut module = HMODULE::default();
            let mut needed = 0u32;
            // The first module reported is always the executable itself.
            unsafe {
                EnumProcessModules(
                    handle,
                    &mut module,
                    std::mem::size_of::<HMODULE>() as u32,
                    &mut needed,
                )
            }
            .map_err(|e| {
                error!("EnumProcessModules failed: {}", e);
                io::Error::new(io::ErrorKind::Other, e.to_string())
            })?;
            Ok(module.0 as usize)
        }
    }

    impl Drop for WindowsMemory {
        fn drop(&mut self) {
            let _ = self.detach();
        }
    }
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::fs::{File, OpenOptions};
    use std::io::{Read, Seek, SeekFrom, Write};

    const EXECUTABLE_HINT: &str = "ffxiv_dx11";

    pub struct LinuxMemory {
        pid: Option<u32>,
        mem_file: Option<File>,
    }

    impl LinuxMemory {
        pub fn new() -> Self {
            Self {
                pid: None,
                mem_file: None,
            }
        }

        fn mem_file(&self) -> io::Result<File> {
            self.mem_file
                .as_ref()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Not attached"))?
                .try_clone()
        }
    }

    /// Find the start address of the first mapping whose path names the executable.
    pub(super) fn parse_module_base(maps: &str, hint: &str) -> Option<usize> {
        maps.lines()
            .filter(|line| line.to_ascii_lowercase().contains(hint))
            .find_map(|line| {
                let range = line.split_whitespace().next()?;
                let start = range.split('-').next()?;
                usize::from_str_radix(start, 16).ok()
            })
    }

    impl ProcessMemory for LinuxMemory {
        fn attach(&mut self, pid: u32) -> io::Result<()> {
            self.detach()?;
            let path = format!("/proc/{}/mem", pid);
            info!("Opening {} for memory access", path);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| {
                    error!("Failed to open {}: {}", path, e);
                    e
                })?;
            info!("Successfully opened {}", path);
            self.pid = Some(pid);
            self.mem_file = Some(file);
            Ok(())
        }

        fn read_memory(&self, address: usize, size: usize) -> io::Result<Vec<u8>> {
            let mut file = self.mem_file()?;
            trace!("Reading /proc mem at 0x{:X} size={}", address, size);
            file.seek(SeekFrom::Start(address as u64))?;
            let mut buffer = vec![0u8; size];
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read < size {
                debug!(
                    "Short /proc mem read at 0x{:X}: {} of {} bytes",
                    address, bytes_read, size
                );
            }
            buffer.truncate(bytes_read);
            Ok(buffer)
        }

        fn write_memory(&self, address: usize, data: &[u8]) -> io::Result<()> {
            let mut file = self.mem_file()?;
            trace!("Writing /proc mem at 0x{:X} size={}", address, data.len());
            file.seek(SeekFrom::Start(address as u64))?;
            file.write_all(data)
        }

        fn detach(&mut self) -> io::Result<()> {
            self.pid = None;
            if self.mem_file.take().is_some() {
                info!("Closed /proc/mem file");
            }
            Ok(())
        }

        fn is_attached(&self) -> bool {
            self.mem_file.is_some()
        }

        fn module_base(&self) -> io::Result<usize> {
            let pid = self
                .pid
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Not attached"))?;
            let maps = std::fs::read_to_string(format!("/proc/{}/maps", pid))?;
            parse_module_base(&maps, EXECUTABLE_HINT).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no mapping for {} in PID={}", EXECUTABLE_HINT, pid),
                )
            })
        }
    }

}

pub fn create_memory() -> Box<dyn ProcessMemory> {
    #[cfg(windows)]
    {
        Box::new(windows_impl::WindowsMemory::new())
    }
    #[cfg(target_os = "linux")]
    {
        Box::new(linux_impl::LinuxMemory::new())
    }
}
