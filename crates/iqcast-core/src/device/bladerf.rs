//! bladeRF transmit backend (libbladeRF FFI)
//!
//! Uses the synchronous streaming interface: configure the TX channel,
//! then push blocks with `bladerf_sync_tx` from the streaming thread.
//! Requires libbladeRF at link time; gated behind the `bladerf` feature.

use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;

use crate::config::DeviceConfig;
use crate::error::{DeviceError, DeviceResult};
use crate::pipeline::{FeedStatus, TxFeeder};

use super::backend::TxBackend;

type BladerfDevice = c_void;

// bladeRF constants
const BLADERF_TX_X1: c_int = 1; // channel layout for single TX
const BLADERF_CHANNEL_TX_0: c_int = 1; // BLADERF_CHANNEL_TX(0)
const BLADERF_FORMAT_SC16_Q11: c_int = 1;

const STREAM_TIMEOUT_MS: c_uint = 3500;

// bladerf_devinfo
#[repr(C)]
struct BladerfDevinfo {
    backend: c_int,
    serial: [c_char; 33],
    usb_bus: u8,
    usb_addr: u8,
    instance: c_uint,
    manufacturer: [c_char; 33],
    product: [c_char; 33],
}

extern "C" {
    fn bladerf_open(device: *mut *mut BladerfDevice, identifier: *const c_char) -> c_int;
    fn bladerf_close(device: *mut BladerfDevice);
    fn bladerf_set_frequency(dev: *mut BladerfDevice, ch: c_int, frequency: u64) -> c_int;
    fn bladerf_set_sample_rate(
        dev: *mut BladerfDevice,
        ch: c_int,
        rate: c_uint,
        actual: *mut c_uint,
    ) -> c_int;
    fn bladerf_set_bandwidth(
        dev: *mut BladerfDevice,
        ch: c_int,
        bandwidth: c_uint,
        actual: *mut c_uint,
    ) -> c_int;
    fn bladerf_set_txvga1(dev: *mut BladerfDevice, gain: c_int) -> c_int;
    fn bladerf_set_txvga2(dev: *mut BladerfDevice, gain: c_int) -> c_int;
    fn bladerf_sync_config(
        dev: *mut BladerfDevice,
        layout: c_int,
        format: c_int,
        num_buffers: c_uint,
        buffer_size: c_uint,
        num_transfers: c_uint,
        stream_timeout: c_uint,
    ) -> c_int;
    fn bladerf_sync_tx(
        dev: *mut BladerfDevice,
        samples: *const c_void,
        num_samples: c_uint,
        metadata: *mut c_void,
        timeout_ms: c_uint,
    ) -> c_int;
    fn bladerf_enable_module(dev: *mut BladerfDevice, ch: c_int, enable: bool) -> c_int;
    fn bladerf_get_device_list(devices: *mut *mut BladerfDevinfo) -> c_int;
    fn bladerf_free_device_list(devices: *mut BladerfDevinfo);
}

#[derive(Debug, Clone)]
pub struct BladerfInfo {
    pub instance: u32,
    pub serial: String,
    pub usb_bus: u8,
    pub usb_addr: u8,
}

/// Enumerate attached bladeRF devices
pub fn list_devices() -> DeviceResult<Vec<BladerfInfo>> {
    let mut devs: *mut BladerfDevinfo = ptr::null_mut();
    let count = unsafe { bladerf_get_device_list(&mut devs) };

    if count <= 0 || devs.is_null() {
        return Ok(Vec::new());
    }

    let mut devices = Vec::new();
    for i in 0..count as usize {
        let dev = unsafe { &*devs.add(i) };
        let serial = unsafe {
            std::ffi::CStr::from_ptr(dev.serial.as_ptr())
                .to_string_lossy()
                .to_string()
        };
        devices.push(BladerfInfo {
            instance: dev.instance,
            serial,
            usb_bus: dev.usb_bus,
            usb_addr: dev.usb_addr,
        });
    }

    unsafe { bladerf_free_device_list(devs) };
    Ok(devices)
}

/// Open bladeRF transmit path
pub struct BladerfTx {
    dev: *mut BladerfDevice,
}

// Raw device pointer; libbladeRF handles are safe to move across threads
unsafe impl Send for BladerfTx {}

impl BladerfTx {
    /// Open the device named by `config.device_id` (empty = first found)
    /// and configure the TX channel: sample rate, frequency, TXVGA gains,
    /// LPF bandwidth, then the synchronous stream parameters.
    pub fn open(config: &DeviceConfig, samples_per_block: usize) -> DeviceResult<Self> {
        let attached = list_devices()?;
        if attached.is_empty() {
            return Err(DeviceError::NoDevices);
        }
        for info in &attached {
            log::info!(
                "bladeRF instance {} (serial {}, usb {}:{})",
                info.instance,
                info.serial,
                info.usb_bus,
                info.usb_addr
            );
        }

        let identifier = CString::new(config.device_id.clone())
            .map_err(|_| DeviceError::Open {
                id: config.device_id.clone(),
                code: -1,
            })?;

        unsafe {
            let mut dev: *mut BladerfDevice = ptr::null_mut();
            let r = bladerf_open(&mut dev, identifier.as_ptr());
            if r != 0 {
                return Err(DeviceError::Open {
                    id: config.device_id.clone(),
                    code: r,
                });
            }
            let tx = Self { dev };

            let mut actual_rate: c_uint = 0;
            let r = bladerf_set_sample_rate(
                tx.dev,
                BLADERF_CHANNEL_TX_0,
                config.sample_rate,
                &mut actual_rate,
            );
            if r != 0 {
                return Err(DeviceError::Configure {
                    what: "sample rate",
                    code: r,
                });
            }
            log::info!("sample rate: {} Hz (requested {})", actual_rate, config.sample_rate);

            let r = bladerf_set_frequency(tx.dev, BLADERF_CHANNEL_TX_0, config.frequency_hz);
            if r != 0 {
                return Err(DeviceError::Configure {
                    what: "frequency",
                    code: r,
                });
            }
            log::info!("frequency: {} Hz", config.frequency_hz);

            let r = bladerf_set_txvga1(tx.dev, config.txvga1_db);
            if r != 0 {
                return Err(DeviceError::Configure {
                    what: "txvga1 gain",
                    code: r,
                });
            }
            let r = bladerf_set_txvga2(tx.dev, config.txvga2_db);
            if r != 0 {
                return Err(DeviceError::Configure {
                    what: "txvga2 gain",
                    code: r,
                });
            }

            let mut actual_bw: c_uint = 0;
            let r = bladerf_set_bandwidth(
                tx.dev,
                BLADERF_CHANNEL_TX_0,
                config.effective_bandwidth(),
                &mut actual_bw,
            );
            if r != 0 {
                return Err(DeviceError::Configure {
                    what: "bandwidth",
                    code: r,
                });
            }
            log::info!("LPF bandwidth: {} Hz", actual_bw);

            let r = bladerf_sync_config(
                tx.dev,
                BLADERF_TX_X1,
                BLADERF_FORMAT_SC16_Q11,
                config.num_buffers,
                samples_per_block as c_uint,
                config.effective_transfers(),
                STREAM_TIMEOUT_MS,
            );
            if r != 0 {
                return Err(DeviceError::Configure {
                    what: "stream",
                    code: r,
                });
            }

            log::info!(
                "bladeRF TX configured ({} buffers x {} samples, {} transfers)",
                config.num_buffers,
                samples_per_block,
                config.effective_transfers()
            );
            Ok(tx)
        }
    }
}

impl TxBackend for BladerfTx {
    fn stream(&mut self, feeder: &mut TxFeeder) -> DeviceResult<u64> {
        let samples_per_block = feeder.block_len() / 2;
        let mut block = vec![0i16; feeder.block_len()];
        let mut blocks = 0u64;

        unsafe {
            let r = bladerf_enable_module(self.dev, BLADERF_CHANNEL_TX_0, true);
            if r != 0 {
                return Err(DeviceError::Configure {
                    what: "TX module",
                    code: r,
                });
            }
            log::info!("TX module enabled");

            loop {
                match feeder.fill(&mut block) {
                    FeedStatus::Stop => break,
                    FeedStatus::Filled => {
                        let r = bladerf_sync_tx(
                            self.dev,
                            block.as_ptr() as *const c_void,
                            samples_per_block as c_uint,
                            ptr::null_mut(),
                            STREAM_TIMEOUT_MS,
                        );
                        if r != 0 {
                            bladerf_enable_module(self.dev, BLADERF_CHANNEL_TX_0, false);
                            return Err(DeviceError::Stream { code: r });
                        }
                        blocks += 1;
                    }
                }
            }

            let r = bladerf_enable_module(self.dev, BLADERF_CHANNEL_TX_0, false);
            if r != 0 {
                log::error!("failed to disable TX module (error {})", r);
            } else {
                log::info!("TX module disabled");
            }
        }

        log::info!("bladeRF TX: {} blocks streamed", blocks);
        Ok(blocks)
    }
}

impl Drop for BladerfTx {
    fn drop(&mut self) {
        unsafe {
            bladerf_close(self.dev);
        }
        log::info!("bladeRF device closed");
    }
}
