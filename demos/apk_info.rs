use std::env;
use std::process;

use apkmeta::read_apk_metadata;

// Prints the package, version, label and permissions of an APK as key:value lines.

//Usage: apk_info <apk-file>
fn main()
{
    let args: Vec<String> = env::args().collect();
    let Some(apk_path) = args.get(1) else {
        println!("error: No APK file specified");
        process::exit(1);
    };

    match read_apk_metadata(apk_path) {
        // A missing package is reported inline, it is not a failure of the tool
        Ok(metadata) => print!("{}", metadata),
        Err(e) => {
            println!("error:{}", e);
            process::exit(1);
        }
    }
}
