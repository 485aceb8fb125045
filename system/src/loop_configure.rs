use core::{
    ffi::{c_int, c_uint, c_void},
    ptr,
};
use linux_raw_sys::loop_device::{loop_config, loop_info64, LOOP_CONFIGURE};
use rustix::{
    fd::{AsFd, AsRawFd},
    io::Result,
    ioctl::{Ioctl, IoctlOutput, Opcode},
};

/// `LOOP_CONFIGURE`, binds a backing file to a loop device in one call.
///
/// The kernel takes its own reference to the file, the descriptor stays owned
/// by the caller. Fails with `EBUSY` when the device is already bound.
///
/// Needs Linux 5.8 or newer. Older kernels answer `EINVAL` for every device,
/// which the caller only sees as a missing free device.
#[repr(transparent)]
pub struct ConfigureLoop {
    config: loop_config,
}

unsafe impl Ioctl for ConfigureLoop {
    type Output = c_int;

    const OPCODE: Opcode = Opcode::old(LOOP_CONFIGURE as _);

    const IS_MUTATING: bool = true;

    fn as_ptr(&mut self) -> *mut c_void {
        ptr::addr_of_mut!(self.config).cast()
    }

    unsafe fn output_from_ptr(
        out: IoctlOutput,
        _extract_output: *mut c_void,
    ) -> Result<Self::Output> {
        Ok(out)
    }
}

impl ConfigureLoop {
    pub fn new<Fd: AsFd>(backing: Fd) -> Self {
        let config = loop_config {
            fd: backing.as_fd().as_raw_fd() as c_uint,
            block_size: 0,
            info: loop_info64 {
                lo_device: 0,
                lo_inode: 0,
                lo_rdevice: 0,
                lo_offset: 0,
                lo_sizelimit: 0,
                lo_number: 0,
                lo_encrypt_type: 0,
                lo_encrypt_key_size: 0,
                lo_flags: 0,
                lo_file_name: [0; 64],
                lo_crypt_name: [0; 64],
                lo_encrypt_key: [0; 32],
                lo_init: [0; 2],
            },
            __reserved: [0; 8],
        };

        Self { config }
    }
}
