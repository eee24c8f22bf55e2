extern crate argparse;
extern crate env_logger;
extern crate http_gopher;
#[macro_use] extern crate log;

use std::path::PathBuf;
use std::process::exit;

use argparse::{ArgumentParser, Store, StoreOption, StoreTrue};

use http_gopher::{Config, Directory, GopherServer, Strategy, TlsAcceptor};
use http_gopher::server::{Handler, HandlerError, Request, Response, Scope};
use http_gopher::ServerError;


/// Serves a directory tree, directories are listed as menus
struct Files {
    directory: Directory,
}

impl Handler for Files {
    fn request(&self, req: &Request, scope: &mut Scope)
        -> Result<Response, HandlerError>
    {
        let listing = self.directory.load(req.path(), &scope.menu)?;
        Ok(listing.into_response(&scope.renderer))
    }
}

struct Options {
    listen: String,
    strategy: Strategy,
    root: PathBuf,
    width: usize,
    timestamps: bool,
    show_stack_trace: bool,
    server_name: Option<String>,
    secret_key: Option<String>,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    adhoc_tls: bool,
}

fn run(options: Options) -> Result<(), ServerError> {
    let mut config = Config::default();
    config.width = options.width;
    config.show_stack_trace = options.show_stack_trace;
    config.server_name = options.server_name;
    config.secret_key = options.secret_key.map(|x| x.into_bytes());
    let files = Files {
        directory: Directory::new(&options.root, "")
            .show_timestamp(options.timestamps)
            .width(options.width),
    };
    let mut server = GopherServer::bind(&options.listen[..], options.strategy,
                                        config, files)?;
    match (options.cert, options.key) {
        (Some(cert), Some(key)) => {
            server = server.with_tls(TlsAcceptor::from_pem_files(cert, key)?);
        }
        (None, None) if options.adhoc_tls => {
            let names = vec!["localhost".to_string()];
            let (tls, _) = TlsAcceptor::self_signed(&names)?;
            server = server.with_tls(tls);
        }
        (None, None) => {}
        _ => {
            error!("Both --tls-cert and --tls-key are required for TLS");
            exit(2);
        }
    }
    info!("Serving {:?}", options.root);
    server.serve_forever()
}

fn main() {
    let mut options = Options {
        listen: "127.0.0.1:7070".to_string(),
        strategy: Strategy::Threaded,
        root: PathBuf::from("."),
        width: 70,
        timestamps: false,
        show_stack_trace: false,
        server_name: None,
        secret_key: None,
        cert: None,
        key: None,
        adhoc_tls: false,
    };
    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Serves a directory over gopher, gopher over TLS \
                            and HTTP, all on the same port");
        ap.refer(&mut options.listen)
            .add_option(&["-l", "--listen"], Store,
                "Address to listen on (default 127.0.0.1:7070)");
        ap.refer(&mut options.strategy)
            .add_option(&["-s", "--strategy"], Store,
                "How to handle connections: iterative, threaded (default) \
                 or forked");
        ap.refer(&mut options.width)
            .add_option(&["-w", "--width"], Store,
                "Width of menus (default 70)");
        ap.refer(&mut options.timestamps)
            .add_option(&["--timestamps"], StoreTrue,
                "Show modification times in directory listings");
        ap.refer(&mut options.show_stack_trace)
            .add_option(&["--show-stack-trace"], StoreTrue,
                "Show details of internal errors to clients");
        ap.refer(&mut options.server_name)
            .add_option(&["--server-name"], StoreOption,
                "Host[:port] to put into links instead of the local address");
        ap.refer(&mut options.secret_key)
            .add_option(&["--secret-key"], StoreOption,
                "Key to sign sessions with, sessions are off without it");
        ap.refer(&mut options.cert)
            .add_option(&["--tls-cert"], StoreOption,
                "PEM file with the certificate chain");
        ap.refer(&mut options.key)
            .add_option(&["--tls-key"], StoreOption,
                "PEM file with the private key");
        ap.refer(&mut options.adhoc_tls)
            .add_option(&["--adhoc-tls"], StoreTrue,
                "Accept TLS with a generated self-signed certificate");
        ap.refer(&mut options.root)
            .add_argument("directory", Store,
                "Directory to serve (default is current directory)");
        ap.parse_args_or_exit();
    }
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(options) {
        error!("{}", e);
        exit(1);
    }
}
