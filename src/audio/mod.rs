pub mod capture;
pub mod device;
pub mod file;
pub mod frame;
pub mod microphone;

pub use capture::CaptureLoop;
pub use device::{CaptureDevice, CaptureFormat};
pub use file::WavFileDevice;
pub use frame::{encode_wav, WAV_HEADER_LEN};
pub use microphone::MicrophoneDevice;
