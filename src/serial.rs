//! Serial port line source, for driving the simulator over a real (or
//! virtual) serial link instead of stdin/stdout.

use std::io::{self, BufReader, Read, Write};
use std::time::Duration;

use log::info;
use serialport::SerialPort;

use crate::error::SimResult;

/// Serial port that blocks on read instead of surfacing timeouts.
pub struct SerialLine {
    port: Box<dyn SerialPort>,
}

impl Read for SerialLine {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.port.read(buf) {
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                other => return other,
            }
        }
    }
}

impl Write for SerialLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

/// Opens `port_name` and returns a buffered reader and a writer on it.
pub fn open(port_name: &str, baud_rate: u32) -> SimResult<(BufReader<SerialLine>, SerialLine)> {
    let port = serialport::new(port_name, baud_rate)
        .timeout(Duration::from_millis(10))
        .open()
        .map_err(io::Error::from)?;
    let writer = port.try_clone().map_err(io::Error::from)?;
    info!("listening on {} at {} baud", port_name, baud_rate);
    Ok((
        BufReader::new(SerialLine { port }),
        SerialLine { port: writer },
    ))
}
