use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use ssh2::Session;

use crate::config::{Auth, Config};

/// Timeout for SSH operations
const SSH_TIMEOUT: Duration = Duration::from_secs(5);

const SSH_USER: &str = "root";
const SSH_PORT: u16 = 22;

/// Keeps the SSH session alive for as long as its channel is read.
pub struct SessionGuard {
    #[allow(dead_code)]
    session: Session,
}

/// Open an SSH connection and stream raw events from a device node.
pub fn open_input_stream(
    device_path: &str,
    config: &Config,
) -> Result<(SessionGuard, ssh2::Channel), Box<dyn std::error::Error + Send + Sync>> {
    log::info!("Connecting to {}", config.host);

    let session = connect_and_authenticate(config)?;
    let mut channel = session.channel_session()?;

    let cmd = format!("cat {}", device_path);
    log::debug!("Executing: {}", cmd);
    channel.exec(&cmd)?;

    log::info!("Stream ready for {}", device_path);
    Ok((SessionGuard { session }, channel))
}

/// Connect to the device for model detection.
pub fn connect_for_detection(config: &Config) -> Result<Session, Box<dyn std::error::Error + Send + Sync>> {
    connect_and_authenticate(config)
}

fn connect_and_authenticate(config: &Config) -> Result<Session, Box<dyn std::error::Error + Send + Sync>> {
    let addr = (config.host.as_str(), SSH_PORT)
        .to_socket_addrs()?
        .next()
        .ok_or("Could not resolve host address")?;
    let tcp = TcpStream::connect_timeout(&addr, SSH_TIMEOUT)?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.handshake()?;
    authenticate(&mut session, &config.auth())?;

    Ok(session)
}

fn authenticate(session: &mut Session, auth: &Auth) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match auth {
        Auth::Key(path) => {
            session.userauth_pubkey_file(SSH_USER, None, path.as_ref(), None)?;
        }
        Auth::Password(pass) => {
            session.userauth_password(SSH_USER, pass)?;
        }
    }

    if !session.authenticated() {
        return Err("SSH authentication failed".into());
    }

    Ok(())
}
